//! Source location resolution.
//!
//! Maps a class name or a stack frame to a link into the source-control UI
//! using the ordered module mapping. The first rule whose regex matches wins.
//!
//! Templates may reference the package pattern's own capture groups as
//! `$1`..`$4`. Every placeholder that gets substituted consumes one capture
//! group, which shifts the index of the groups holding the file name and
//! line number (or the class name) further right.

use regex::Captures;
use tracing::trace;

use crate::rules::Rules;
use crate::version::{self, collapse_slashes};

/// Highest placeholder index a template may use.
const MAX_PLACEHOLDERS: usize = 4;

/// What kind of reference is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// A frame such as `com.acme.Foo.bar(Foo.java:42)`
    Frame,
    /// A bare class name such as `com.acme.Foo`
    Class,
}

/// A resolved link into the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub url: String,
    pub revision: String,
    pub module_path: String,
    /// Java package with dots replaced by slashes
    pub package_path: String,
    /// `Foo.java` for frames, `Foo` for classes
    pub file_name: String,
    pub line_number: Option<u32>,
}

/// Resolve a reference against the module mapping.
///
/// Returns `None` when no rule matches; callers fall back to a search link.
pub fn resolve(
    rules: &Rules,
    reference: &str,
    kind: Reference,
    version: Option<&str>,
) -> Option<ResolvedLocation> {
    let revision = version::revision(version);

    let (rule, caps) = rules.modules().iter().find_map(|rule| {
        let regex = match kind {
            Reference::Frame => &rule.frame,
            Reference::Class => &rule.class,
        };
        regex.captures(reference).map(|caps| (rule, caps))
    })?;

    trace!(pattern = %rule.pattern, reference, "Module rule matched");

    let (module_path, skipped) = expand_template(&rule.template, &caps);
    let package_path = caps.get(1).map_or("", |m| m.as_str()).replace('.', "/");
    let base = format!(
        "{}/{revision}/{module_path}/src/main/java/{package_path}",
        rules.urls.file
    );

    let (file_name, line_number, url) = match kind {
        Reference::Frame => {
            let file_name = caps.get(3 + skipped)?.as_str();
            let line_number: u32 = caps.get(4 + skipped)?.as_str().parse().ok()?;
            let url = format!("{base}/{file_name}#L{line_number}");
            (file_name, Some(line_number), url)
        }
        Reference::Class => {
            let class_name = caps.get(2 + skipped)?.as_str();
            (class_name, None, format!("{base}/{class_name}.java"))
        }
    };

    Some(ResolvedLocation {
        url: collapse_slashes(&url),
        revision: revision.to_string(),
        module_path,
        package_path,
        file_name: file_name.to_string(),
        line_number,
    })
}

/// Substitute `$1`..`$4` and count the capture groups consumed.
fn expand_template(template: &str, caps: &Captures<'_>) -> (String, usize) {
    let mut module_path = template.to_string();
    let mut skipped = 0;

    for index in 1..=MAX_PLACEHOLDERS {
        let token = format!("${index}");
        if !module_path.contains(&token) {
            continue;
        }
        // group 1 is the whole package, the pattern's own groups follow it
        if let Some(group) = caps.get(index + 1) {
            module_path = module_path.replace(&token, group.as_str());
            skipped += 1;
        }
    }

    (module_path, skipped)
}
