//! Implementation of the `talkd show` command.
//!
//! Displays the wire, pending request, daemon and archive of one talk.

use crate::cli::ShowArgs;
use crate::config::Config;
use crate::error::{Result, TalkError};
use crate::registry::Talks;
use crate::talk::Snapshot;

pub fn cmd_show(config: &Config, args: ShowArgs) -> Result<()> {
    let talks = Talks::open(&config.talks_dir)?;
    let snapshot = talks.get(args.number)?.read();

    if args.json {
        let json = serde_json::to_string_pretty(snapshot.document()).map_err(|e| {
            TalkError::UserError(format!("failed to serialize talk #{}: {}", args.number, e))
        })?;
        println!("{}", json);
        return Ok(());
    }

    print!("{}", render(&snapshot));
    Ok(())
}

/// Human-readable rendering of a talk.
fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "Talk #{} (revision {})\n",
        snapshot.number(),
        snapshot.revision()
    ));
    out.push_str(&format!("{}\n", rule));

    match snapshot.wire() {
        Some(wire) => {
            out.push_str(&format!("Thread:     {}#{}\n", wire.repo, wire.issue));
            out.push_str(&format!("Seen:       comment {}\n", wire.seen));
        }
        None => out.push_str("Thread:     (no wire)\n"),
    }
    if let Some(public) = snapshot.is_public() {
        out.push_str(&format!("Public:     {}\n", public));
    }

    if let Some(request) = snapshot.request() {
        out.push_str(&format!("\nRequest {} ({})\n", request.id, request.kind));
        if let Some(author) = &request.author {
            out.push_str(&format!("  Author:   {}\n", author));
        }
        for (name, value) in &request.args {
            out.push_str(&format!("  {:<9} {}\n", format!("{}:", name), value));
        }
    }

    if let Some(daemon) = snapshot.daemon() {
        out.push_str(&format!("\nDaemon {} [{}]\n", daemon.id, daemon.status));
        out.push_str(&format!("  Title:    {}\n", daemon.title));
        if let Some(started) = daemon.started {
            out.push_str(&format!(
                "  Started:  {}\n",
                started.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        if let Some(seen) = daemon.seen {
            out.push_str(&format!("  Seen:     {}\n", seen.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        if let Some(ended) = daemon.ended {
            out.push_str(&format!("  Ended:    {}\n", ended.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        if let Some(handle) = &daemon.handle {
            out.push_str(&format!("  Handle:   {}\n", handle));
        }
        out.push_str(&format!("  Dir:      {}\n", daemon.dir));
        out.push_str(&format!("  Script:   {}\n", daemon.script));
    }

    let archive = snapshot.archive();
    if !archive.is_empty() {
        out.push_str(&format!("\nArchive ({}):\n", archive.len()));
        for entry in &archive {
            let code = entry.code.map(|c| format!(" code {}", c)).unwrap_or_default();
            out.push_str(&format!(
                "  - {} {}: {}{}\n",
                entry.id, entry.title, entry.status, code
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talk::{Batch, Talk};

    #[test]
    fn render_shows_wire_request_and_archive() {
        let talk = Talk::in_memory(3);
        talk.modify(
            Batch::new()
                .attr("public", "true")
                .add("wire")
                .add("repo").set("acme/widgets").up()
                .add("issue").set("17").up()
                .add("seen").set("4").up()
                .up()
                .add("request")
                .attr("id", "4")
                .attr("author", "jeff")
                .add("type").set("release").up()
                .add("args")
                .add("arg").attr("name", "tag").set("1.0").up()
                .up()
                .up()
                .add("archive")
                .add("log").attr("id", "3-1")
                .add("title").set("merge").up()
                .add("status").set("finished").up()
                .add("code").set("0"),
        )
        .unwrap();

        let text = render(&talk.read());

        assert!(text.contains("Talk #3 (revision 1)"));
        assert!(text.contains("Thread:     acme/widgets#17"));
        assert!(text.contains("Seen:       comment 4"));
        assert!(text.contains("Public:     true"));
        assert!(text.contains("Request 4 (release)"));
        assert!(text.contains("tag:"));
        assert!(text.contains("- 3-1 merge: finished code 0"));
        assert!(!text.contains("Daemon"));
    }

    #[test]
    fn render_tolerates_empty_talk() {
        let text = render(&Talk::in_memory(1).read());
        assert!(text.contains("(no wire)"));
        assert!(!text.contains("Archive"));
    }
}
