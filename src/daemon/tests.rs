//! Tests for the daemon lifecycle.

use super::*;
use crate::error::TalkError;
use crate::talk::{Batch, Talk};
use crate::test_support::FakeRemote;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn setup() -> (Arc<FakeRemote>, Daemon, Talk) {
    let remote = Arc::new(FakeRemote::new());
    let daemon = Daemon::new(remote.clone());
    (remote, daemon, Talk::in_memory(1))
}

fn launch() -> Launch {
    Launch {
        title: "merge".to_string(),
        dir: "/tmp/talk-1".to_string(),
        script: "echo hi ;".to_string(),
        env: vec!["A=1".to_string()],
        args: vec![("head_branch".to_string(), "master".to_string())],
        author: Some("jeff".to_string()),
        comment: Some(4),
    }
}

fn start_at(daemon: &Daemon, talk: &Talk, now: DateTime<Utc>) {
    talk.update(|s| daemon.plan_start(s, &launch(), now).map(Some))
        .unwrap();
}

fn poll_at(daemon: &Daemon, talk: &Talk, now: DateTime<Utc>) -> Option<u64> {
    talk.update(|s| Ok(daemon.plan_poll(s, now))).unwrap()
}

fn status(talk: &Talk) -> DaemonStatus {
    talk.read().daemon().unwrap().status
}

#[test]
fn start_records_pending_daemon_with_handle() {
    let (remote, daemon, talk) = setup();
    let id = daemon.start(&talk, &launch()).unwrap();

    let record = talk.read().daemon().unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.status, DaemonStatus::Pending);
    assert_eq!(record.title, "merge");
    assert_eq!(record.dir, "/tmp/talk-1");
    assert_eq!(record.handle.as_deref(), Some("fake-1"));
    assert_eq!(record.arg("head_branch"), Some("master"));
    assert_eq!(record.author.as_deref(), Some("jeff"));
    assert_eq!(record.comment, Some(4));
    assert!(record.started.is_some());

    let started = remote.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].script, "echo hi ;");
    assert_eq!(started[0].env, vec!["A=1"]);
}

#[test]
fn second_start_is_already_running_and_changes_nothing() {
    let (remote, daemon, talk) = setup();
    daemon.start(&talk, &launch()).unwrap();
    let before = talk.read();

    let err = daemon.start(&talk, &launch()).unwrap_err();

    assert!(matches!(err, TalkError::AlreadyRunning(_)));
    assert_eq!(talk.revision(), before.revision());
    assert_eq!(talk.read().document(), before.document());
    assert_eq!(remote.started().len(), 1);
}

#[test]
fn failed_remote_start_leaves_pending_without_handle() {
    let (remote, daemon, talk) = setup();
    remote.fail_starts(true);
    start_at(&daemon, &talk, t0());

    let record = talk.read().daemon().unwrap();
    assert_eq!(record.status, DaemonStatus::Pending);
    assert!(record.handle.is_none());

    assert_eq!(poll_at(&daemon, &talk, t0() + Duration::minutes(1)), None);
    poll_at(&daemon, &talk, t0() + Duration::minutes(6));
    assert_eq!(status(&talk), DaemonStatus::TimedOut);
}

#[test]
fn poll_moves_through_running_to_finished() {
    let (remote, daemon, talk) = setup();
    start_at(&daemon, &talk, t0());

    assert!(poll_at(&daemon, &talk, t0() + Duration::seconds(5)).is_some());
    assert_eq!(status(&talk), DaemonStatus::Running);

    remote.report(Liveness::exited(2));
    poll_at(&daemon, &talk, t0() + Duration::seconds(10));
    let record = talk.read().daemon().unwrap();
    assert_eq!(record.status, DaemonStatus::Finished(2));
    assert!(record.ended.is_some());
}

#[test]
fn poll_after_terminal_is_stable() {
    let (remote, daemon, talk) = setup();
    start_at(&daemon, &talk, t0());
    remote.report(Liveness::exited(0));
    poll_at(&daemon, &talk, t0());
    let revision = talk.revision();

    remote.report(Liveness::exited(9));
    for _ in 0..3 {
        assert_eq!(daemon.poll(&talk).unwrap(), Some(DaemonStatus::Finished(0)));
    }
    assert_eq!(talk.revision(), revision);
}

#[test]
fn running_daemon_settles_between_liveness_refreshes() {
    let (_remote, daemon, talk) = setup();
    start_at(&daemon, &talk, t0());

    assert!(poll_at(&daemon, &talk, t0() + Duration::seconds(1)).is_some());
    assert_eq!(poll_at(&daemon, &talk, t0() + Duration::seconds(2)), None);
    assert!(poll_at(&daemon, &talk, t0() + Duration::seconds(90)).is_some());
}

#[test]
fn fresh_liveness_defers_timeout() {
    let (remote, daemon, talk) = setup();
    start_at(&daemon, &talk, t0());
    poll_at(&daemon, &talk, t0() + Duration::minutes(4));

    remote.fail_polls(true);
    poll_at(&daemon, &talk, t0() + Duration::minutes(8));
    assert_eq!(status(&talk), DaemonStatus::Running);

    poll_at(&daemon, &talk, t0() + Duration::minutes(10));
    assert_eq!(status(&talk), DaemonStatus::TimedOut);
    assert_eq!(remote.killed().len(), 1);
}

#[test]
fn kill_is_unconditional_even_when_remote_fails() {
    let (remote, daemon, talk) = setup();
    daemon.start(&talk, &launch()).unwrap();
    remote.fail_kills(true);

    assert_eq!(daemon.kill(&talk).unwrap(), Some(DaemonStatus::Killed));
    assert_eq!(remote.killed(), vec![Handle("fake-1".to_string())]);
    assert!(talk.read().daemon().unwrap().ended.is_some());
}

#[test]
fn first_terminal_outcome_wins() {
    let (remote, daemon, talk) = setup();
    start_at(&daemon, &talk, t0());
    daemon.kill(&talk).unwrap();
    let revision = talk.revision();

    remote.report(Liveness::exited(0));
    assert_eq!(poll_at(&daemon, &talk, t0()), None);
    assert_eq!(
        talk.update(|s| Ok(daemon.plan_timeout(s, t0() + Duration::hours(1))))
            .unwrap(),
        None
    );
    assert_eq!(daemon.kill(&talk).unwrap(), Some(DaemonStatus::Killed));
    assert_eq!(talk.revision(), revision);
}

#[test]
fn kill_and_poll_without_daemon_are_noops() {
    let (_remote, daemon, talk) = setup();
    talk.modify(Batch::new().add("wire")).unwrap();
    assert_eq!(daemon.kill(&talk).unwrap(), None);
    assert_eq!(daemon.poll(&talk).unwrap(), None);
    assert_eq!(talk.revision(), 1);
}

#[test]
fn custom_inactivity_threshold() {
    let remote = Arc::new(FakeRemote::new());
    let daemon = Daemon::with_inactivity(remote.clone(), Duration::seconds(30));
    let talk = Talk::in_memory(1);
    remote.fail_polls(true);
    start_at(&daemon, &talk, t0());

    assert_eq!(poll_at(&daemon, &talk, t0() + Duration::seconds(30)), None);
    poll_at(&daemon, &talk, t0() + Duration::seconds(31));
    assert_eq!(status(&talk), DaemonStatus::TimedOut);
}
