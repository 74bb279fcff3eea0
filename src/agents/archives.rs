use super::Services;
use crate::events::{Event, EventAction};
use crate::talk::{Batch, Snapshot};
use serde_json::json;

/// Move a reported terminal daemon into the archive.
pub(super) fn execute(snapshot: &Snapshot, services: &Services) -> Option<Batch> {
    let daemon = snapshot
        .daemon()
        .filter(|d| d.status.is_terminal() && d.reported)?;
    let mut batch = Batch::new();
    if !snapshot.exists("/talk/archive") {
        batch = batch.add("archive").up();
    }
    batch = batch
        .xpath("/talk/archive")
        .add("log")
        .attr("id", daemon.id.as_str())
        .add("title").set(daemon.title.as_str()).up()
        .add("status").set(daemon.status.as_str()).up();
    if let Some(code) = daemon.status.code() {
        batch = batch.add("code").set(code.to_string()).up();
    }
    if let Some(ended) = daemon.ended {
        batch = batch.add("ended").set(ended.to_rfc3339()).up();
    }
    services.events.record(
        Event::new(EventAction::Archive)
            .with_talk(snapshot.number())
            .with_details(json!({"daemon": daemon.id, "status": daemon.status.as_str()})),
    );
    Some(batch.xpath("/talk/daemon").remove())
}
