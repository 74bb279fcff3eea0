//! Build profiles.
//!
//! A profile is the per-repository YAML document describing how each
//! operation runs, for example:
//!
//! ```yaml
//! docker:
//!   image: acme/builder
//! env:
//!   MAVEN_OPTS: -Xmx1g
//! install: |
//!   sudo apt-get install -y zip
//! uninstall:
//!   - rm -rf /tmp/cache
//! merge:
//!   script: mvn clean install
//! release:
//!   env: [CHANNEL=stable]
//!   script:
//!     - mvn versions:set "-DnewVersion=${tag}"
//!     - mvn deploy
//! ```
//!
//! Sections are addressed by dotted key paths (`""` is the root,
//! `"release.env"` a nested key). Parsing is lenient: unknown keys are
//! kept and ignored by consumers.

use crate::error::{Result, TalkError};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

mod source;

pub use source::{DirProfiles, ProfileSource};

/// Image used when a profile does not name one.
pub const DEFAULT_IMAGE: &str = "yegor256/rultor-image";

/// A parsed, read-only profile document.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    root: Value,
}

impl Default for Profile {
    fn default() -> Self {
        Self::empty()
    }
}

impl Profile {
    /// A profile with no sections at all.
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    /// Parse a profile from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::empty());
        }
        let root: Value = serde_yaml::from_str(yaml)
            .map_err(|e| TalkError::Profile(format!("failed to parse profile YAML: {}", e)))?;
        match root {
            Value::Mapping(_) | Value::Null => Ok(Self { root }),
            _ => Err(TalkError::Profile(
                "profile must be a mapping of sections".to_string(),
            )),
        }
    }

    /// Load a profile from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TalkError::Profile(format!(
                "failed to read profile '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Resolve a dotted key path; `""` is the root.
    pub fn node(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|k| !k.is_empty())
            .try_fold(&self.root, |value, key| value.get(key))
            .filter(|v| !v.is_null())
    }

    /// Whether the path resolves to a non-null value.
    pub fn has(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    /// Docker image for the build container.
    pub fn image(&self) -> String {
        self.node("docker.image")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string())
    }

    /// Reasons this profile is considered deprecated, empty when it is not.
    pub fn deprecations(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !["merge", "deploy", "release"].iter().any(|s| self.has(s)) {
            reasons.push(
                "the profile defines none of the `merge`, `deploy`, `release` sections; \
                 relying on implicit commands is deprecated"
                    .to_string(),
            );
        }
        if self.node("docker.image").and_then(Value::as_str) == Some(DEFAULT_IMAGE) {
            reasons.push(format!(
                "the default image `{}` is deprecated; set `docker.image` to your own image",
                DEFAULT_IMAGE
            ));
        }
        reasons
    }
}

/// Path to a profile file inside a directory, derived from `owner/name`.
pub(crate) fn profile_file(dir: &Path, repo: &str) -> PathBuf {
    dir.join(format!("{}.yml", repo.replace('/', "_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
docker:
  image: acme/builder
env: ALPHA=909
merge:
  script: mvn clean install
release:
  env:
    - A=1
"#;

    #[test]
    fn resolves_dotted_paths() {
        let profile = Profile::from_yaml(PROFILE).unwrap();
        assert_eq!(
            profile.node("merge.script").and_then(Value::as_str),
            Some("mvn clean install")
        );
        assert!(profile.node("").is_some());
        assert!(profile.has("release.env"));
        assert!(!profile.has("deploy"));
        assert!(!profile.has("merge.script.deeper"));
    }

    #[test]
    fn image_defaults_when_missing() {
        assert_eq!(Profile::from_yaml(PROFILE).unwrap().image(), "acme/builder");
        assert_eq!(Profile::empty().image(), DEFAULT_IMAGE);
    }

    #[test]
    fn empty_profile_is_deprecated() {
        assert!(!Profile::empty().deprecations().is_empty());
        assert!(Profile::from_yaml("").unwrap().node("merge").is_none());
    }

    #[test]
    fn legacy_image_is_deprecated() {
        let profile =
            Profile::from_yaml("docker:\n  image: yegor256/rultor-image\nmerge:\n  script: x\n")
                .unwrap();
        let reasons = profile.deprecations();
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("yegor256/rultor-image"));
    }

    #[test]
    fn custom_image_with_sections_is_valid() {
        let profile = Profile::from_yaml(PROFILE).unwrap();
        assert!(profile.deprecations().is_empty());
    }

    #[test]
    fn rejects_non_mapping_profiles() {
        assert!(matches!(
            Profile::from_yaml("- a\n- b\n"),
            Err(TalkError::Profile(_))
        ));
        assert!(Profile::from_yaml("key: [unclosed").is_err());
    }

    #[test]
    fn profile_file_flattens_repo_name() {
        assert_eq!(
            profile_file(Path::new("/p"), "acme/widgets"),
            PathBuf::from("/p/acme_widgets.yml")
        );
    }
}
