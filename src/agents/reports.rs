//! Announcing daemons and reporting their outcomes.

use super::{Services, phrases};
use crate::daemon::Handle;
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::profile::Profile;
use crate::talk::{Batch, Snapshot};
use serde_json::json;

const DAEMON: &str = "/talk/daemon";
const TAIL_LINES: usize = 20;

/// Tell the requester the daemon started, once.
pub(super) fn announce(snapshot: &Snapshot, services: &Services) -> Result<Option<Batch>> {
    let Some(daemon) = snapshot.daemon().filter(|d| !d.announced) else {
        return Ok(None);
    };
    if let Some(wire) = snapshot.wire() {
        let profile = services.profiles.fetch(&wire.repo).unwrap_or_else(|e| {
            tracing::debug!(talk = snapshot.number(), error = %e, "profile unavailable for announcement");
            Profile::empty()
        });
        let text = phrases::started(&daemon, &profile.image(), &profile.deprecations());
        services.reply(&wire, daemon.comment, &text)?;
    }
    Ok(Some(Batch::at(DAEMON).attr("announced", "true")))
}

/// Report a terminal daemon's outcome, once.
pub(super) fn report(snapshot: &Snapshot, services: &Services) -> Result<Option<Batch>> {
    let Some(daemon) = snapshot
        .daemon()
        .filter(|d| d.status.is_terminal() && !d.reported)
    else {
        return Ok(None);
    };
    if let Some(wire) = snapshot.wire() {
        let tail = match &daemon.handle {
            Some(handle) if !daemon.status.is_success() => services
                .daemon
                .remote()
                .tail(&Handle(handle.clone()), TAIL_LINES)
                .unwrap_or_else(|e| {
                    tracing::debug!(talk = snapshot.number(), error = %e, "no log tail");
                    Vec::new()
                }),
            _ => Vec::new(),
        };
        let minutes = services.daemon.inactivity().num_minutes();
        services.reply(&wire, daemon.comment, &phrases::outcome(&daemon, &tail, minutes))?;
    }
    services.events.record(
        Event::new(EventAction::DaemonEnd)
            .with_talk(snapshot.number())
            .with_details(json!({
                "daemon": daemon.id,
                "status": daemon.status.as_str(),
                "code": daemon.status.code(),
            })),
    );
    Ok(Some(Batch::at(DAEMON).attr("reported", "true")))
}
