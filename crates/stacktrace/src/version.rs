//! Application version classification and rendering.
//!
//! Versions are either release tags (`1.4.0`) or snapshot builds of the form
//! `<semver>-<branch>-<shortsha>-SNAPSHOT`.

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::SourceUrls;

/// Marker written by logback when the version property is not set.
const UNDEFINED_MARKER: &str = "IS_UNDEFINED";

/// Revision used when the version is unknown.
pub const DEFAULT_REVISION: &str = "master";

/// `-<8 char hash>-SNAPSHOT` at the end of the version.
static SNAPSHOT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\w{8})-SNAPSHOT$").unwrap());

/// `<semver>-<branch>-<hash>-SNAPSHOT`, branch optional.
static SNAPSHOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^-]+-(?:(.+)-)?(\w{8})-SNAPSHOT$").unwrap());

/// Runs of two or more slashes not preceded by a colon.
static REPEATED_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^:])/{2,}").unwrap());

/// A classified version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version<'a> {
    Undefined,
    Snapshot {
        revision: &'a str,
        branch: Option<&'a str>,
    },
    Release(&'a str),
}

impl<'a> Version<'a> {
    pub fn parse(version: Option<&'a str>) -> Self {
        let Some(version) = version.filter(|v| !v.contains(UNDEFINED_MARKER)) else {
            return Self::Undefined;
        };

        if let Some(caps) = SNAPSHOT.captures(version) {
            if let Some(revision) = caps.get(2) {
                return Self::Snapshot {
                    revision: revision.as_str(),
                    branch: caps.get(1).map(|m| m.as_str()),
                };
            }
        }

        // `-<hash>-SNAPSHOT` without a leading semver still names a commit
        if let Some(revision) = SNAPSHOT_SUFFIX.captures(version).and_then(|c| c.get(1)) {
            return Self::Snapshot {
                revision: revision.as_str(),
                branch: None,
            };
        }

        Self::Release(version)
    }
}

/// Source-control revision a version was built from.
pub fn revision(version: Option<&str>) -> &str {
    match Version::parse(version) {
        Version::Undefined => DEFAULT_REVISION,
        Version::Snapshot { revision, .. } => revision,
        Version::Release(tag) => tag,
    }
}

/// Render a version as Slack links into the source tree.
pub fn format_version(urls: &SourceUrls, version: Option<&str>) -> String {
    match Version::parse(version) {
        Version::Undefined => "undefined".to_string(),
        Version::Snapshot { revision, branch } => {
            let revision_link = tree_link(urls, revision);
            match branch {
                Some(branch) => format!("{revision_link} @ {}", tree_link(urls, branch)),
                None => revision_link,
            }
        }
        Version::Release(tag) => tree_link(urls, tag),
    }
}

fn tree_link(urls: &SourceUrls, reference: &str) -> String {
    let url = collapse_slashes(&format!("{}/{reference}", urls.tree));
    format!("<{url}|{reference}>")
}

/// Collapse `//` runs in a URL while keeping the scheme separator.
pub fn collapse_slashes(url: &str) -> String {
    REPEATED_SLASHES.replace_all(url, "$1/").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> SourceUrls {
        SourceUrls {
            file: "https://git.example.com/awesome/blob".to_string(),
            tree: "https://git.example.com/awesome/tree/".to_string(),
            search: "https://git.example.com/search?q=".to_string(),
        }
    }

    #[test]
    fn test_snapshot_with_branch() {
        let version = Version::parse(Some("1.2.3-feature-login-a1b2c3d4-SNAPSHOT"));
        assert_eq!(
            version,
            Version::Snapshot {
                revision: "a1b2c3d4",
                branch: Some("feature-login"),
            }
        );

        assert_eq!(
            format_version(&urls(), Some("1.2.3-feature-login-a1b2c3d4-SNAPSHOT")),
            "<https://git.example.com/awesome/tree/a1b2c3d4|a1b2c3d4> @ \
             <https://git.example.com/awesome/tree/feature-login|feature-login>"
        );
    }

    #[test]
    fn test_snapshot_without_branch() {
        assert_eq!(
            format_version(&urls(), Some("1.2.3-0badc0de-SNAPSHOT")),
            "<https://git.example.com/awesome/tree/0badc0de|0badc0de>"
        );
        assert_eq!(revision(Some("1.2.3-0badc0de-SNAPSHOT")), "0badc0de");
    }

    #[test]
    fn test_undefined_versions() {
        assert_eq!(format_version(&urls(), None), "undefined");
        assert_eq!(format_version(&urls(), Some("IS_UNDEFINED")), "undefined");
        assert_eq!(format_version(&urls(), Some("version_IS_UNDEFINED")), "undefined");
        assert_eq!(revision(None), "master");
        assert_eq!(revision(Some("IS_UNDEFINED")), "master");
    }

    #[test]
    fn test_release_tag() {
        assert_eq!(
            format_version(&urls(), Some("2.0.1")),
            "<https://git.example.com/awesome/tree/2.0.1|2.0.1>"
        );
        assert_eq!(revision(Some("2.0.1")), "2.0.1");
    }

    #[test]
    fn test_short_hash_is_not_a_snapshot() {
        // seven characters: not a snapshot build, treated as a tag
        assert_eq!(revision(Some("1.0.0-main-a1b2c3d-SNAPSHOT")), "1.0.0-main-a1b2c3d-SNAPSHOT");
    }

    #[test]
    fn test_collapse_slashes() {
        assert_eq!(
            collapse_slashes("https://host//a///b/c"),
            "https://host/a/b/c"
        );
    }
}
