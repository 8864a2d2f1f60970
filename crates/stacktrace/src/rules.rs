//! Compiled configuration rules.
//!
//! Patterns arrive as strings in [`config::Settings`]; they are compiled here
//! exactly once so that record processing never fails on a bad pattern.

use std::borrow::Cow;

use config::Settings;
use regex::{Match, Regex};

use crate::error::RuleError;

/// URL prefixes into the source-control UI.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    /// Prefix for file links: `<file>/<revision>/<module>/src/main/java/...`
    pub file: String,
    /// Prefix for tree links: `<tree>/<revision-or-branch>`
    pub tree: String,
    /// Prefix for code search, used when a frame cannot be resolved
    pub search: String,
}

/// One application package, matched against frames and class names.
#[derive(Debug)]
struct ApplicationPackage {
    /// `at <pattern>.` anywhere in a frame line
    frame: Regex,
    /// `<pattern>.` at the start of a class name
    class: Regex,
}

/// One package-to-module mapping rule.
#[derive(Debug)]
pub struct ModuleRule {
    pub pattern: String,
    pub template: String,
    /// Lookup for frames carrying a method and a `(File.java:42)` location.
    pub(crate) frame: Regex,
    /// Lookup for bare class names.
    pub(crate) class: Regex,
}

/// One exclusion rule: all field patterns must match.
#[derive(Debug)]
pub struct ExclusionRule {
    pub(crate) fields: Vec<(String, Regex)>,
}

/// All configured rules, compiled and read-only.
#[derive(Debug)]
pub struct Rules {
    pub urls: SourceUrls,
    application: Vec<ApplicationPackage>,
    exception: Option<Regex>,
    modules: Vec<ModuleRule>,
    exclusions: Vec<ExclusionRule>,
}

impl Rules {
    /// Compile every pattern in the settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, RuleError> {
        let application = settings
            .application_packages
            .iter()
            .map(|pattern| {
                Ok(ApplicationPackage {
                    frame: compile(&format!(r"at (?:{pattern})\."))?,
                    class: compile(&format!(r"^(?:{pattern})\."))?,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        let exception = if settings.exception_packages.is_empty() {
            None
        } else {
            let alternation = settings
                .exception_packages
                .iter()
                .map(|pattern| format!("(?:{pattern})"))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&format!(r"(?:{alternation})\."))?)
        };

        let modules = settings
            .module_mapping
            .iter()
            .map(|(pattern, template)| {
                Ok(ModuleRule {
                    pattern: pattern.clone(),
                    template: template.clone(),
                    frame: compile(&format!(
                        r"({pattern}[.\w_]*)(\.[\w_$]*){{2}}\(([^:]*):(\d+)\)"
                    ))?,
                    class: compile(&format!(r"({pattern}.*)\.([^.]+)"))?,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        let exclusions = settings
            .exclusion_filters
            .iter()
            .map(|rule| {
                let fields = rule
                    .iter()
                    .map(|(field, pattern)| Ok((field.clone(), compile(pattern)?)))
                    .collect::<Result<Vec<_>, RuleError>>()?;
                Ok(ExclusionRule { fields })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        Ok(Self {
            urls: SourceUrls {
                file: settings.file_url.clone(),
                tree: settings.tree_url.clone(),
                search: settings.search_url.clone(),
            },
            application,
            exception,
            modules,
            exclusions,
        })
    }

    /// Module mapping rules in declaration order.
    pub fn modules(&self) -> &[ModuleRule] {
        &self.modules
    }

    pub fn exclusions(&self) -> &[ExclusionRule] {
        &self.exclusions
    }

    /// Find the first application package named in a frame line.
    ///
    /// The returned match spans `at <package>.`.
    pub fn application_frame<'t>(&self, frame: &'t str) -> Option<Match<'t>> {
        self.application.iter().find_map(|p| p.frame.find(frame))
    }

    /// Strip the first matching application package from a class name.
    pub fn strip_application_package<'a>(&self, class: &'a str) -> &'a str {
        self.application
            .iter()
            .find_map(|p| p.class.find(class))
            .map_or(class, |m| &class[m.end()..])
    }

    /// Strip the first occurrence of any exception package from a header line.
    pub fn strip_exception_package<'a>(&self, header: &'a str) -> Cow<'a, str> {
        match &self.exception {
            Some(regex) => regex.replace(header, ""),
            None => Cow::Borrowed(header),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
