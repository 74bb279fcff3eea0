//! Converting a request into a running daemon.

use super::{Services, phrases};
use crate::command;
use crate::daemon::{Daemon, Launch};
use crate::error::{Result, TalkError};
use crate::events::{Event, EventAction};
use crate::talk::{Batch, Snapshot};
use chrono::{DateTime, Utc};
use serde_json::json;

const REQUEST: &str = "/talk/request";

/// Start a daemon for the pending request, or reject the request when the
/// profile is broken or has no script for it. Either way the request is
/// resolved.
pub(super) fn execute(
    snapshot: &Snapshot,
    services: &Services,
    now: DateTime<Utc>,
) -> Result<Option<Batch>> {
    if snapshot.exists("/talk/daemon") {
        return Ok(None);
    }
    let (Some(request), Some(wire)) = (snapshot.request(), snapshot.wire()) else {
        return Ok(None);
    };
    let section = request.kind.as_str();
    let profile = match services.profiles.fetch(&wire.repo) {
        Err(e @ TalkError::Profile(_)) => return reject(snapshot, services, &e),
        other => other?,
    };
    if !profile.has(&format!("{}.script", section)) {
        tracing::info!(talk = snapshot.number(), section, "profile has no script, rejecting");
        services.reply(&wire, request.comment, &phrases::no_section(section))?;
        return Ok(Some(Batch::at(REQUEST).remove()));
    }

    let overrides: Vec<(String, String)> = request
        .args
        .iter()
        .map(|(name, value)| (name.to_uppercase(), value.clone()))
        .collect();
    let command = match command::build(&profile, section, &overrides) {
        Err(e @ TalkError::Profile(_)) => return reject(snapshot, services, &e),
        other => other?,
    };
    let id = Daemon::next_id(snapshot);
    let launch = Launch {
        title: section.to_string(),
        dir: services.workdir.join(&id).to_string_lossy().to_string(),
        script: command.text(),
        env: command.env,
        args: request.args.clone(),
        author: request.author.clone(),
        comment: request.comment,
    };
    let batch = services.daemon.plan_start(snapshot, &launch, now)?;
    services.events.record(
        Event::new(EventAction::DaemonStart)
            .with_talk(snapshot.number())
            .with_details(json!({
                "daemon": id,
                "title": section,
                "repo": wire.repo,
                "image": command.image,
            })),
    );
    Ok(Some(batch.append(Batch::at(REQUEST).remove())))
}

fn reject(snapshot: &Snapshot, services: &Services, error: &TalkError) -> Result<Option<Batch>> {
    let (Some(request), Some(wire)) = (snapshot.request(), snapshot.wire()) else {
        return Ok(None);
    };
    tracing::warn!(talk = snapshot.number(), error = %error, "broken profile, rejecting");
    services.reply(&wire, request.comment, &phrases::broken_profile(error))?;
    Ok(Some(Batch::at(REQUEST).remove()))
}
