//! Turning new comments into requests.

use super::{Services, phrases};
use crate::daemon::DaemonStatus;
use crate::error::Result;
use crate::talk::{Batch, RequestKind, Snapshot};
use crate::ticket::{Command, Comment, ThreadId, parse_command};
use chrono::Utc;

const WIRE: &str = "/talk/wire";

/// Read comments after `wire/seen`, act on the first command, and advance
/// `seen` past everything consumed.
pub(super) fn execute(snapshot: &Snapshot, services: &Services) -> Result<Option<Batch>> {
    let Some(wire) = snapshot.wire() else {
        return Ok(None);
    };
    let thread = ThreadId::new(wire.repo.as_str(), wire.issue);
    let comments = services.ticket.list_comments(&thread, wire.seen)?;
    let Some(last) = comments.last() else {
        return Ok(None);
    };

    let login = services.ticket.login();
    let mut seen = last.id;
    let mut batch = Batch::new();
    for comment in &comments {
        if comment.author == login {
            continue;
        }
        let Some(command) = parse_command(login, &comment.body) else {
            continue;
        };
        tracing::info!(
            talk = snapshot.number(),
            comment = comment.id,
            author = %comment.author,
            "command received: {:?}",
            command
        );
        seen = comment.id;
        batch = handle(snapshot, services, &thread, comment, command)?;
        break;
    }
    Ok(Some(batch.put(snapshot, WIRE, "seen", seen.to_string())))
}

fn handle(
    snapshot: &Snapshot,
    services: &Services,
    thread: &ThreadId,
    comment: &Comment,
    command: Command,
) -> Result<Batch> {
    let daemon = snapshot.daemon();
    if command == Command::Stop {
        return match daemon.filter(|d| !d.status.is_terminal()) {
            Some(daemon) => {
                services.answer(thread, Some(comment), &phrases::stopping(&daemon.title))?;
                Ok(services
                    .daemon
                    .plan_kill(snapshot, DaemonStatus::Killed, Utc::now())
                    .unwrap_or_default())
            }
            None => {
                services.answer(thread, Some(comment), phrases::NOTHING_TO_STOP)?;
                Ok(Batch::new())
            }
        };
    }
    if let Command::Unknown(_) = command {
        services.answer(thread, Some(comment), phrases::UNKNOWN)?;
        return Ok(Batch::new());
    }
    if let Some(busy) = daemon
        .map(|d| d.title)
        .or_else(|| snapshot.request().map(|r| r.kind.to_string()))
    {
        services.answer(thread, Some(comment), &phrases::busy(&busy))?;
        return Ok(Batch::new());
    }

    let repo = services.ticket.repo_info(&thread.repo)?;
    let (kind, args) = match command {
        Command::Merge => {
            let Some(pull) = services.ticket.pull(thread)? else {
                services.answer(thread, Some(comment), phrases::NOT_A_PULL)?;
                return Ok(Batch::new());
            };
            if !pull.checks_passed {
                services.answer(thread, Some(comment), phrases::CHECKS_FAILED)?;
                return Ok(Batch::new());
            }
            (
                RequestKind::Merge,
                vec![
                    ("head", repo.clone_url),
                    ("head_branch", pull.base_branch),
                    ("fork", pull.fork),
                    ("fork_branch", pull.head_branch),
                ],
            )
        }
        Command::Release { tag: None } => {
            services.answer(thread, Some(comment), phrases::NO_TAG)?;
            return Ok(Batch::new());
        }
        Command::Release { tag: Some(tag) } => (
            RequestKind::Release,
            vec![
                ("head", repo.clone_url),
                ("head_branch", repo.default_branch),
                ("tag", tag),
            ],
        ),
        Command::Deploy => (
            RequestKind::Deploy,
            vec![("head", repo.clone_url), ("head_branch", repo.default_branch)],
        ),
        Command::Run => (
            RequestKind::Run,
            vec![("head", repo.clone_url), ("head_branch", repo.default_branch)],
        ),
        Command::Stop | Command::Unknown(_) => return Ok(Batch::new()),
    };

    let mut batch = Batch::new()
        .add("request")
        .attr("id", comment.id.to_string())
        .attr("author", comment.author.as_str())
        .attr("comment", comment.id.to_string())
        .add("type")
        .set(kind.as_str())
        .up()
        .add("args");
    for (name, value) in args {
        batch = batch.add("arg").attr("name", name).set(value).up();
    }
    Ok(batch)
}
