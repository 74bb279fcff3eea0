//! Implementation of the `talkd run` command.
//!
//! `run` is the runner loop. Each tick it:
//! - opens a talk for every inbox thread that has none yet
//! - applies kill requests left by `talkd kill`
//! - sweeps all talks through the agent pipeline until quiescent
//! - records the tick in the pulse file for `talkd status`
//!
//! The runner lock in the talks directory keeps a second runner from
//! writing the same talk files; `kill` routes through the runner instead.

use super::{open_inbox, open_services};
use crate::agents::Services;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::locks;
use crate::pipeline::{Pipeline, Pulse, SweepReport, Tick, sweep};
use crate::registry::Talks;
use crate::ticket::Inbox;
use chrono::Utc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn cmd_run(config: &Config, args: RunArgs) -> Result<()> {
    let _lock = locks::acquire_runner_lock(&config.talks_dir, "run", config.lock_stale_minutes)?;

    let inbox = open_inbox(config);
    let services = open_services(config, inbox.clone());
    let runner = Runner::new(
        Talks::open(&config.talks_dir)?,
        inbox,
        Pipeline::standard(services, config.pass_budget),
        Pulse::in_dir(&config.talks_dir),
        config.workers,
    );
    tracing::info!(
        talks = %config.talks_dir.display(),
        inbox = %config.inbox_dir.display(),
        workers = config.workers,
        "runner started"
    );

    loop {
        let report = runner.tick()?;
        if args.once {
            println!(
                "Swept {} talk(s): {} quiescent, {} over budget, {} busy, {} failure(s).",
                report.talks,
                report.quiescent,
                report.exceeded,
                report.busy,
                report.failures.len()
            );
            for failure in &report.failures {
                println!("  - {}", failure);
            }
            return Ok(());
        }
        thread::sleep(Duration::from_millis(config.interval_ms));
    }
}

/// One runner: talks, their source of new threads, and the pipeline
/// driving them.
pub struct Runner {
    talks: Talks,
    inbox: Arc<Inbox>,
    pipeline: Pipeline,
    pulse: Pulse,
    workers: usize,
}

impl Runner {
    pub fn new(
        talks: Talks,
        inbox: Arc<Inbox>,
        pipeline: Pipeline,
        pulse: Pulse,
        workers: usize,
    ) -> Self {
        Self {
            talks,
            inbox,
            pipeline,
            pulse,
            workers,
        }
    }

    pub fn talks(&self) -> &Talks {
        &self.talks
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    pub fn services(&self) -> &Services {
        self.pipeline.services()
    }

    /// Pick up new threads and kill requests, sweep every talk, and record
    /// the pulse.
    ///
    /// Failures inside the sweep are collected into the report; only an
    /// unreadable inbox fails the tick.
    pub fn tick(&self) -> Result<SweepReport> {
        let start = Utc::now();
        let clock = Instant::now();

        let mut failures = Vec::new();
        for thread in self.inbox.threads()? {
            if let Err(e) = self.talks.find_or_create(&thread) {
                tracing::warn!(thread = %thread, error = %e, "failed to open talk");
                failures.push(format!("{}: {}", thread, e));
            }
        }

        failures.extend(self.talks.apply_kill_requests(self.services()));

        let mut report = sweep(&self.talks, &self.pipeline, self.workers);
        failures.append(&mut report.failures);
        report.failures = failures;

        let tick = Tick {
            start,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            talks: report.talks,
        };
        if let Err(e) = self.pulse.tick(tick, &report.failures) {
            tracing::warn!(error = %e, "failed to record pulse");
        }
        tracing::info!(
            talks = report.talks,
            quiescent = report.quiescent,
            exceeded = report.exceeded,
            busy = report.busy,
            failures = report.failures.len(),
            "sweep finished"
        );
        Ok(report)
    }
}
