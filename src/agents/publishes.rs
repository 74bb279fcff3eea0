use super::Services;
use crate::error::Result;
use crate::talk::{Batch, Snapshot};

/// Once something is archived, record whether the talk may be shown
/// publicly, following the repository's visibility.
pub(super) fn execute(snapshot: &Snapshot, services: &Services) -> Result<Option<Batch>> {
    if snapshot.is_public().is_some() || !snapshot.exists("/talk/archive/log") {
        return Ok(None);
    }
    let Some(wire) = snapshot.wire() else {
        return Ok(None);
    };
    let public = services.ticket.repo_info(&wire.repo)?.public;
    Ok(Some(Batch::new().attr("public", public.to_string())))
}
