//! Implementation of the `talkd status` command.
//!
//! Displays runner health from the pulse file, the runner lock, and one
//! line per talk.

use crate::config::Config;
use crate::error::Result;
use crate::locks;
use crate::pipeline::{Health, PULSE_FILE};
use crate::registry::Talks;
use chrono::Utc;

pub fn cmd_status(config: &Config) -> Result<()> {
    let health = Health::load(config.talks_dir.join(PULSE_FILE))?;
    let lock = locks::inspect_runner_lock(&config.talks_dir, config.lock_stale_minutes)?;
    let talks = Talks::open(&config.talks_dir)?;

    println!("Runner Status");
    println!("=============");
    println!();
    println!("{}", health.report(Utc::now()));
    println!();
    match lock {
        Some(info) => println!("Runner lock: {}", info),
        None => println!("Runner lock: free"),
    }
    println!();

    let all = talks.all();
    println!("Talks ({}):", all.len());
    for talk in &all {
        let snapshot = talk.read();
        let thread = snapshot
            .wire()
            .map(|w| format!("{}#{}", w.repo, w.issue))
            .unwrap_or_else(|| "-".to_string());
        let state = match (snapshot.daemon(), snapshot.request()) {
            (Some(daemon), _) => format!("daemon {} {}", daemon.id, daemon.status),
            (None, Some(request)) => format!("request {} pending", request.kind),
            (None, None) => "idle".to_string(),
        };
        println!(
            "  #{:<5} {:<30} {} (archived: {})",
            snapshot.number(),
            thread,
            state,
            snapshot.archive().len()
        );
    }
    Ok(())
}
