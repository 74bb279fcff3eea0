//! Where profiles come from.

use super::{Profile, profile_file};
use crate::error::Result;
use std::path::PathBuf;

/// Read-only supplier of a repository's profile.
pub trait ProfileSource: Send + Sync {
    fn fetch(&self, repo: &str) -> Result<Profile>;
}

/// Profiles stored as `<dir>/<owner>_<name>.yml`.
///
/// A repository without a file gets the empty profile.
#[derive(Debug, Clone)]
pub struct DirProfiles {
    dir: PathBuf,
}

impl DirProfiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ProfileSource for DirProfiles {
    fn fetch(&self, repo: &str) -> Result<Profile> {
        let path = profile_file(&self.dir, repo);
        if !path.exists() {
            tracing::debug!(repo, path = %path.display(), "no profile file, using empty profile");
            return Ok(Profile::empty());
        }
        Profile::load(path)
    }
}
