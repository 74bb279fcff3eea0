//! In-memory collaborators and fixtures for unit tests.

use crate::agents::Services;
use crate::daemon::{Daemon, Handle, Liveness, Remote};
use crate::error::{Result, TalkError};
use crate::profile::{Profile, ProfileSource};
use crate::talk::{Batch, Talk};
use crate::ticket::{Comment, PullInfo, RepoInfo, ThreadId, Ticket};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// One recorded `Remote::start` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Started {
    pub dir: String,
    pub script: String,
    pub env: Vec<String>,
}

#[derive(Debug)]
struct RemoteState {
    started: Vec<Started>,
    killed: Vec<Handle>,
    liveness: Liveness,
    fail_start: bool,
    fail_poll: bool,
    fail_kill: bool,
    tail: Vec<String>,
}

/// Scripted remote: every handle reports the same configured liveness.
#[derive(Debug)]
pub(crate) struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RemoteState {
                started: Vec::new(),
                killed: Vec::new(),
                liveness: Liveness::running(),
                fail_start: false,
                fail_poll: false,
                fail_kill: false,
                tail: Vec::new(),
            }),
        }
    }

    pub(crate) fn report(&self, liveness: Liveness) {
        lock(&self.state).liveness = liveness;
    }

    pub(crate) fn fail_starts(&self, fail: bool) {
        lock(&self.state).fail_start = fail;
    }

    pub(crate) fn fail_polls(&self, fail: bool) {
        lock(&self.state).fail_poll = fail;
    }

    pub(crate) fn fail_kills(&self, fail: bool) {
        lock(&self.state).fail_kill = fail;
    }

    pub(crate) fn set_tail(&self, lines: &[&str]) {
        lock(&self.state).tail = lines.iter().map(|l| l.to_string()).collect();
    }

    pub(crate) fn started(&self) -> Vec<Started> {
        lock(&self.state).started.clone()
    }

    pub(crate) fn killed(&self) -> Vec<Handle> {
        lock(&self.state).killed.clone()
    }
}

impl Remote for FakeRemote {
    fn start(&self, dir: &str, script: &str, env: &[String]) -> Result<Handle> {
        let mut state = lock(&self.state);
        if state.fail_start {
            return Err(TalkError::RemoteUnavailable("host is down".to_string()));
        }
        state.started.push(Started {
            dir: dir.to_string(),
            script: script.to_string(),
            env: env.to_vec(),
        });
        Ok(Handle(format!("fake-{}", state.started.len())))
    }

    fn poll(&self, _handle: &Handle) -> Result<Liveness> {
        let state = lock(&self.state);
        if state.fail_poll {
            return Err(TalkError::RemoteUnavailable("host is down".to_string()));
        }
        Ok(state.liveness)
    }

    fn kill(&self, handle: &Handle) -> Result<()> {
        let mut state = lock(&self.state);
        state.killed.push(handle.clone());
        if state.fail_kill {
            return Err(TalkError::RemoteUnavailable("host is down".to_string()));
        }
        Ok(())
    }

    fn tail(&self, _handle: &Handle, lines: usize) -> Result<Vec<String>> {
        let state = lock(&self.state);
        let skip = state.tail.len().saturating_sub(lines);
        Ok(state.tail[skip..].to_vec())
    }
}

#[derive(Debug, Default)]
struct TicketState {
    threads: HashMap<ThreadId, Vec<Comment>>,
    repos: HashMap<String, RepoInfo>,
    pulls: HashMap<ThreadId, PullInfo>,
    failing: bool,
}

/// Ticket system held in memory.
#[derive(Debug)]
pub(crate) struct MemoryTicket {
    login: String,
    state: Mutex<TicketState>,
}

impl MemoryTicket {
    pub(crate) fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            state: Mutex::new(TicketState::default()),
        }
    }

    /// Add a comment by `author`, returning its id.
    pub(crate) fn comment(&self, thread: &ThreadId, author: &str, body: &str) -> u64 {
        let mut state = lock(&self.state);
        let comments = state.threads.entry(thread.clone()).or_default();
        let id = comments.len() as u64 + 1;
        comments.push(Comment {
            id,
            author: author.to_string(),
            body: body.to_string(),
            posted_at: Utc::now(),
        });
        id
    }

    pub(crate) fn comments(&self, thread: &ThreadId) -> Vec<Comment> {
        lock(&self.state)
            .threads
            .get(thread)
            .cloned()
            .unwrap_or_default()
    }

    /// Bodies of the comments posted by the bot.
    pub(crate) fn answers(&self, thread: &ThreadId) -> Vec<String> {
        self.comments(thread)
            .into_iter()
            .filter(|c| c.author == self.login)
            .map(|c| c.body)
            .collect()
    }

    pub(crate) fn set_pull(&self, thread: &ThreadId, pull: PullInfo) {
        lock(&self.state).pulls.insert(thread.clone(), pull);
    }

    pub(crate) fn set_repo(&self, repo: &str, info: RepoInfo) {
        lock(&self.state).repos.insert(repo.to_string(), info);
    }

    /// Make every call fail as if the service were unreachable.
    pub(crate) fn fail(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    fn check(&self) -> Result<()> {
        if lock(&self.state).failing {
            return Err(TalkError::RemoteUnavailable("ticket system is down".to_string()));
        }
        Ok(())
    }
}

impl Ticket for MemoryTicket {
    fn login(&self) -> &str {
        &self.login
    }

    fn post_comment(&self, thread: &ThreadId, text: &str) -> Result<u64> {
        self.check()?;
        Ok(self.comment(thread, &self.login, text))
    }

    fn list_comments(&self, thread: &ThreadId, since: u64) -> Result<Vec<Comment>> {
        self.check()?;
        Ok(self
            .comments(thread)
            .into_iter()
            .filter(|c| c.id > since)
            .collect())
    }

    fn repo_info(&self, repo: &str) -> Result<RepoInfo> {
        self.check()?;
        Ok(lock(&self.state)
            .repos
            .get(repo)
            .cloned()
            .unwrap_or_else(|| RepoInfo::guess(repo)))
    }

    fn pull(&self, thread: &ThreadId) -> Result<Option<PullInfo>> {
        self.check()?;
        Ok(lock(&self.state).pulls.get(thread).cloned())
    }
}

/// A pull request whose checks passed.
pub(crate) fn green_pull() -> PullInfo {
    PullInfo {
        head_branch: "feature".to_string(),
        base_branch: "master".to_string(),
        fork: "git@github.com:jeff/widgets.git".to_string(),
        checks_passed: true,
    }
}

/// Serves the same profile for every repository.
#[derive(Debug)]
pub(crate) struct FixedProfiles(pub Profile);

impl ProfileSource for FixedProfiles {
    fn fetch(&self, _repo: &str) -> Result<Profile> {
        Ok(self.0.clone())
    }
}

/// Profile source whose every fetch fails.
pub(crate) struct BrokenProfiles(pub &'static str);

impl ProfileSource for BrokenProfiles {
    fn fetch(&self, _repo: &str) -> Result<Profile> {
        Err(TalkError::Profile(self.0.to_string()))
    }
}

pub(crate) const PROFILE: &str = r#"
docker:
  image: acme/builder
merge:
  script: make merge
deploy:
  script: make deploy
release:
  script:
    - make release
"#;

/// A talk wired to `acme/widgets#17` with in-memory collaborators.
pub(crate) struct Fixture {
    pub ticket: Arc<MemoryTicket>,
    pub remote: Arc<FakeRemote>,
    pub services: Services,
    pub talk: Talk,
    pub thread: ThreadId,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_profile(PROFILE)
    }

    pub(crate) fn with_profile(yaml: &str) -> Self {
        Self::with_profiles(Arc::new(FixedProfiles(Profile::from_yaml(yaml).unwrap())))
    }

    pub(crate) fn with_profiles(profiles: Arc<dyn ProfileSource>) -> Self {
        let ticket = Arc::new(MemoryTicket::new("rultor"));
        let remote = Arc::new(FakeRemote::new());
        let services = Services::new(ticket.clone(), profiles, Daemon::new(remote.clone()))
            .with_workdir("/tmp/talkd-test");
        let thread = ThreadId::new("acme/widgets", 17);
        let talk = Talk::in_memory(1);
        talk.modify(
            Batch::new()
                .add("wire")
                .add("repo").set("acme/widgets").up()
                .add("issue").set("17").up()
                .add("seen").set("0"),
        )
        .unwrap();
        Self {
            ticket,
            remote,
            services,
            talk,
            thread,
        }
    }

    /// Post a comment from `author` in the fixture thread.
    pub(crate) fn say(&self, author: &str, body: &str) -> u64 {
        self.ticket.comment(&self.thread, author, body)
    }

    pub(crate) fn answers(&self) -> Vec<String> {
        self.ticket.answers(&self.thread)
    }
}
