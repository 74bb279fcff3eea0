use super::{KillMode, Services};
use crate::daemon::DaemonStatus;
use crate::talk::{Batch, Snapshot};
use chrono::{DateTime, Utc};

pub(super) fn execute(
    snapshot: &Snapshot,
    services: &Services,
    mode: KillMode,
    now: DateTime<Utc>,
) -> Option<Batch> {
    match mode {
        KillMode::Inactive => services.daemon.plan_timeout(snapshot, now),
        KillMode::Always => services.daemon.plan_kill(snapshot, DaemonStatus::Killed, now),
    }
}
