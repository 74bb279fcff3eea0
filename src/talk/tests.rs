//! Tests for the talk document, batches, and persistence.

use super::*;
use crate::daemon::DaemonStatus;
use tempfile::TempDir;

fn talk_with_request() -> Talk {
    let talk = Talk::in_memory(1);
    talk.modify(
        Batch::new()
            .add("wire")
            .add("repo").set("acme/widgets").up()
            .add("issue").set("17").up()
            .up()
            .add("request")
            .attr("id", "r1")
            .attr("author", "jeff")
            .add("type").set("release").up()
            .add("args")
            .add("arg").attr("name", "tag").set("1.0").up()
            .add("arg").attr("name", "head_branch").set("master"),
    )
    .unwrap();
    talk
}

#[test]
fn new_talk_is_empty_at_revision_zero() {
    let talk = Talk::in_memory(3);
    let snapshot = talk.read();
    assert_eq!(snapshot.number(), 3);
    assert_eq!(snapshot.revision(), 0);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.node(snapshot.root()).unwrap().name(), ROOT);
}

#[test]
fn committed_batch_advances_revision_by_one() {
    let talk = talk_with_request();
    assert_eq!(talk.revision(), 1);

    let rev = talk
        .modify(Batch::at("/talk/request").attr("seen", "yes").add("x").set("y"))
        .unwrap();
    assert_eq!(rev, 2);
    assert_eq!(talk.read().text("/talk/request/x"), Some("y"));
}

#[test]
fn empty_batch_is_a_noop() {
    let talk = talk_with_request();
    let before = talk.read();
    assert_eq!(talk.modify(Batch::new()).unwrap(), 1);
    assert_eq!(talk.revision(), 1);
    assert_eq!(talk.read().document(), before.document());
}

#[test]
fn malformed_batch_commits_nothing() {
    let talk = talk_with_request();
    let before = talk.read();

    // First edit is valid, second targets a missing node.
    let err = talk
        .modify(
            Batch::at("/talk")
                .attr("public", "true")
                .xpath("/talk/daemon")
                .attr("id", "d1"),
        )
        .unwrap_err();

    assert!(matches!(err, TalkError::MalformedMutation(_)));
    assert!(err.to_string().contains("/talk/daemon"));
    assert_eq!(talk.revision(), 1);
    assert_eq!(talk.read().document(), before.document());
    assert_eq!(talk.read().is_public(), None);
}

#[test]
fn ambiguous_target_is_malformed() {
    let talk = talk_with_request();
    let err = talk
        .modify(Batch::at("/talk/request/args/arg").set("z"))
        .unwrap_err();
    assert!(err.to_string().contains("matched 2 nodes"));
    assert_eq!(talk.revision(), 1);
}

#[test]
fn removing_root_is_malformed() {
    let talk = Talk::in_memory(1);
    let err = talk.modify(Batch::at("/talk").remove()).unwrap_err();
    assert!(matches!(err, TalkError::MalformedMutation(_)));
    assert_eq!(talk.revision(), 0);
}

#[test]
fn remove_drops_whole_subtree() {
    let talk = talk_with_request();
    let before = talk.read().len();
    talk.modify(Batch::at("/talk/request").remove()).unwrap();
    let snapshot = talk.read();
    assert!(!snapshot.exists("/talk/request"));
    assert!(!snapshot.exists("/talk/request/args/arg"));
    assert!(snapshot.len() < before);
    assert!(snapshot.exists("/talk/wire/repo"));
}

#[test]
fn predicates_select_by_attribute_and_position() {
    let snapshot = talk_with_request().read();
    assert_eq!(
        snapshot.text("/talk/request/args/arg[@name='tag']"),
        Some("1.0")
    );
    assert_eq!(snapshot.text("/talk/request/args/arg[2]"), Some("master"));
    assert_eq!(
        snapshot.text("/talk/request/args/arg[last()]"),
        Some("master")
    );
    assert_eq!(snapshot.find("/talk/*").len(), 2);
    assert!(snapshot.find("not-a-path").is_empty());
}

#[test]
fn snapshots_are_immutable() {
    let talk = talk_with_request();
    let old = talk.read();
    talk.modify(Batch::at("/talk/request").remove()).unwrap();
    assert!(old.exists("/talk/request"));
    assert!(!talk.read().exists("/talk/request"));
}

#[test]
fn typed_views_read_wire_and_request() {
    let snapshot = talk_with_request().read();

    let wire = snapshot.wire().unwrap();
    assert_eq!(wire.repo, "acme/widgets");
    assert_eq!(wire.issue, 17);
    assert_eq!(wire.seen, 0);

    let request = snapshot.request().unwrap();
    assert_eq!(request.id, "r1");
    assert_eq!(request.kind, RequestKind::Release);
    assert_eq!(request.arg("tag"), Some("1.0"));
    assert_eq!(request.author.as_deref(), Some("jeff"));
    assert_eq!(
        request.args,
        vec![
            ("tag".to_string(), "1.0".to_string()),
            ("head_branch".to_string(), "master".to_string())
        ]
    );
    assert!(snapshot.daemon().is_none());
}

#[test]
fn typed_view_reads_daemon_status() {
    let talk = Talk::in_memory(1);
    talk.modify(
        Batch::new()
            .add("daemon")
            .attr("id", "d1")
            .add("title").set("merge").up()
            .add("status").set("finished").up()
            .add("code").set("3"),
    )
    .unwrap();
    let daemon = talk.read().daemon().unwrap();
    assert_eq!(daemon.id, "d1");
    assert_eq!(daemon.status, DaemonStatus::Finished(3));
    assert!(!daemon.announced);
}

#[test]
fn update_sees_post_lock_state_and_can_decline() {
    let talk = talk_with_request();

    let none = talk.update(|_| Ok(None)).unwrap();
    assert_eq!(none, None);
    assert_eq!(talk.revision(), 1);

    let rev = talk
        .update(|snapshot| {
            assert_eq!(snapshot.revision(), 1);
            Ok(Some(Batch::new().attr("public", "false")))
        })
        .unwrap();
    assert_eq!(rev, Some(2));
    assert_eq!(talk.read().is_public(), Some(false));
}

#[test]
fn update_error_leaves_talk_unchanged() {
    let talk = talk_with_request();
    let err = talk
        .update(|_| Err(TalkError::AlreadyRunning("talk #1".to_string())))
        .unwrap_err();
    assert!(matches!(err, TalkError::AlreadyRunning(_)));
    assert_eq!(talk.revision(), 1);
}

#[test]
fn concurrent_modifications_are_serialized() {
    let talk = std::sync::Arc::new(Talk::in_memory(1));
    talk.modify(Batch::new().add("log")).unwrap();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let talk = talk.clone();
            scope.spawn(move || {
                talk.modify(Batch::at("/talk/log").add("entry").attr("n", i.to_string()))
                    .unwrap();
            });
        }
    });

    assert_eq!(talk.revision(), 9);
    assert_eq!(talk.read().find("/talk/log/entry").len(), 8);
}

#[test]
fn persisted_talk_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let talk = Talk::create(temp_dir.path(), 5).unwrap();
    talk.modify(Batch::new().add("wire").add("repo").set("a/b"))
        .unwrap();
    let path = talk.path().unwrap().to_path_buf();
    assert!(path.ends_with("5.json"));

    let reopened = Talk::open(&path).unwrap();
    assert_eq!(reopened.number(), 5);
    assert_eq!(reopened.revision(), 1);
    assert_eq!(reopened.read().text("/talk/wire/repo"), Some("a/b"));
    assert_eq!(reopened.read().document(), talk.read().document());
}

#[test]
fn failed_batch_does_not_touch_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let talk = Talk::create(temp_dir.path(), 2).unwrap();
    talk.modify(Batch::new().attr("public", "true")).unwrap();
    let path = talk.path().unwrap().to_path_buf();
    let before = std::fs::read_to_string(&path).unwrap();

    assert!(talk.modify(Batch::at("/talk/missing").set("x")).is_err());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn create_with_persists_initial_batch_or_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let talk =
        Talk::create_with(temp_dir.path(), 3, &Batch::new().add("wire").add("repo").set("a/b"))
            .unwrap();
    let reopened = Talk::open(talk.path().unwrap()).unwrap();
    assert_eq!(reopened.revision(), 1);
    assert_eq!(reopened.read().text("/talk/wire/repo"), Some("a/b"));

    let err = Talk::create_with(temp_dir.path(), 4, &Batch::at("/talk/missing").set("x"))
        .unwrap_err();
    assert!(matches!(err, TalkError::MalformedMutation(_)));
    assert!(!temp_dir.path().join("4.json").exists());
    assert!(Talk::create(temp_dir.path(), 4).is_ok());
}

#[test]
fn create_refuses_existing_number() {
    let temp_dir = TempDir::new().unwrap();
    Talk::create(temp_dir.path(), 1).unwrap();
    assert!(Talk::create(temp_dir.path(), 1).is_err());
    assert!(Talk::create(temp_dir.path(), 0).is_err());
}

#[test]
fn pass_guard_is_exclusive() {
    let talk = Talk::in_memory(1);
    let guard = talk.try_begin_pass();
    assert!(guard.is_some());
    assert!(talk.try_begin_pass().is_none());
    drop(guard);
    assert!(talk.try_begin_pass().is_some());
}
