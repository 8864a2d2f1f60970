//! Stack-trace normalization.
//!
//! A raw Java trace is split into one segment per causal exception (the
//! top-level exception and every `Caused by:`). Within a segment:
//!
//! - the header is bolded with its exception package stripped
//! - frames from application packages are shortened and linked to source
//! - runs of foreign frames collapse into a single [`ELLIPSIS`] line
//! - existing `... N more` markers are dropped

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::locator::{self, Reference};
use crate::rules::Rules;

/// Line standing in for one or more collapsed foreign frames.
pub const ELLIPSIS: &str = "\t...";

static AT_FRAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+at ").unwrap());

static ELISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\.\.\. \d+ (?:more|common frames omitted)\s*$").unwrap()
});

/// `Foo$$EnhancerBySpringCGLIB$$1a2b.` style synthetic class names.
static NESTED_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\$\$[\w]+)+\.").unwrap());

/// Fully-qualified class, file and line of an original frame.
static SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"at ([\w$.]+)\.[\w$<>]+\(([^():]*):(\d+)\)").unwrap()
});

/// A shortened frame: indent, remaining package, `Class.method`, parenthesised
/// tail, then optional logback packaging data such as `~[app.jar:1.0]`.
static SHORT_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\s*)at ((?:[\w$]+\.)*?)([\w$]+\.[\w$<>]+)(?:\(([^()]*)\))?(?:\s*~?\[[^\]]*\])?\s*$",
    )
    .unwrap()
});

static FILE_AND_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^():]*):(\d+)$").unwrap());

const GENERATED: &str = "(<generated>)";

type Step = fn(&str) -> Cow<'_, str>;

/// Pure rewrites applied to an application frame after its package is stripped.
const FRAME_STEPS: [Step; 2] = [collapse_nested_classes, strip_generated];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Header(&'a str),
    Frame(&'a str),
    Other(&'a str),
    Skip,
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() || ELISION.is_match(line) {
        Line::Skip
    } else if !line.starts_with(char::is_whitespace) {
        Line::Header(line)
    } else if AT_FRAME.is_match(line) {
        Line::Frame(line)
    } else {
        Line::Other(line)
    }
}

/// Normalize a raw trace into one formatted block per causal exception.
pub fn normalize(rules: &Rules, raw: Option<&str>, version: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut segments: Vec<Vec<String>> = Vec::new();

    for line in raw.lines() {
        let line = match classify(line) {
            Line::Skip => continue,
            Line::Header(header) => {
                segments.push(vec![format_header(rules, header)]);
                continue;
            }
            Line::Frame(frame) => match rules.application_frame(frame) {
                Some(m) => {
                    let stripped = format!("{}at {}", &frame[..m.start()], &frame[m.end()..]);
                    shorten_frame(rules, frame, &stripped, version)
                }
                None => ELLIPSIS.to_string(),
            },
            Line::Other(other) => other.trim_end().to_string(),
        };

        if segments.is_empty() {
            segments.push(Vec::new());
        }
        if let Some(current) = segments.last_mut() {
            if line == ELLIPSIS && current.last().is_some_and(|last| last == ELLIPSIS) {
                continue;
            }
            current.push(line);
        }
    }

    segments.into_iter().map(|lines| lines.join("\n")).collect()
}

/// Bold the header with the first exception package removed.
fn format_header(rules: &Rules, header: &str) -> String {
    format!("*{}*", rules.strip_exception_package(header.trim()))
}

/// Shorten an application frame.
///
/// `frame` is the original line, used for source lookup; `stripped` has the
/// application package already removed.
fn shorten_frame(rules: &Rules, frame: &str, stripped: &str, version: Option<&str>) -> String {
    let text = FRAME_STEPS
        .iter()
        .fold(stripped.to_string(), |text, step| step(&text).into_owned());

    let Some(caps) = SHORT_FRAME.captures(&text) else {
        return text;
    };

    let indent = caps.get(1).map_or("", |m| m.as_str());
    let package = caps.get(2).map_or("", |m| m.as_str()).trim_end_matches('.');
    let label = caps.get(3).map_or("", |m| m.as_str());

    let mut out = format!("{indent}_{label}_");
    if !package.is_empty() {
        out.push_str(" in ");
        out.push_str(package);
    }

    if let Some(tail) = caps.get(4).map(|m| m.as_str()) {
        match FILE_AND_LINE.captures(tail) {
            Some(location) => {
                let line = &location[2];
                let url = match locator::resolve(rules, frame, Reference::Frame, version) {
                    Some(resolved) => resolved.url,
                    None => search_url(rules, frame).unwrap_or_else(|| rules.urls.search.clone()),
                };
                out.push_str(&format!(": <{url}|{line}>"));
            }
            None => {
                out.push_str(&format!(" ({tail})"));
            }
        }
    }

    out
}

/// Code-search link for a frame no module rule covers.
fn search_url(rules: &Rules, frame: &str) -> Option<String> {
    let caps = SOURCE.captures(frame)?;
    let class = caps.get(1)?.as_str();
    let file = caps.get(2)?.as_str();

    let path = match class.rsplit_once('.') {
        Some((package, _)) => format!("{}/{file}", package.replace('.', "/")),
        None => file.to_string(),
    };

    Some(format!("{}{path}", rules.urls.search))
}

fn collapse_nested_classes(text: &str) -> Cow<'_, str> {
    NESTED_CLASS.replace_all(text, "$$.")
}

fn strip_generated(text: &str) -> Cow<'_, str> {
    if text.contains(GENERATED) {
        Cow::Owned(text.replace(GENERATED, ""))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures;

    const TRACE: &str = "java.lang.IllegalStateException: Failed to load user
\tat com.awesome.project.core.user.UserService.findById(UserService.java:42)
\tat com.awesome.project.core.user.UserService$$SpringCGLIB$$0.findById(<generated>)
\tat org.springframework.aop.framework.CglibAopProxy.intercept(CglibAopProxy.java:720)
\tat org.springframework.web.servlet.FrameworkServlet.service(FrameworkServlet.java:897)
\tat com.awesome.project.web.UserController.get(UserController.java:31)
Caused by: com.awesome.project.exception.NotFoundException: user 7
\tat com.awesome.project.core.user.UserRepository.load(UserRepository.java:19)
\tat jdk.internal.reflect.GeneratedMethodAccessor.invoke(Unknown Source)
\t... 12 more
";

    #[test]
    fn test_absent_trace() {
        assert!(normalize(&fixtures::rules(), None, None).is_empty());
    }

    #[test]
    fn test_one_segment_per_causal_exception() {
        let segments = normalize(&fixtures::rules(), Some(TRACE), None);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with("*IllegalStateException: Failed to load user*"));
        assert!(segments[1].starts_with("*Caused by: NotFoundException: user 7*"));
    }

    #[test]
    fn test_full_rendering() {
        let segments = normalize(&fixtures::rules(), Some(TRACE), None);

        assert_eq!(
            segments[0],
            "*IllegalStateException: Failed to load user*\n\
             \t_UserService.findById_ in core.user: \
             <https://git.example.com/awesome/blob/master/core-user/src/main/java/com/awesome/project/core/user/UserService.java#L42|42>\n\
             \t_UserService$.findById_ in core.user\n\
             \t...\n\
             \t_UserController.get_ in web: \
             <https://git.example.com/awesome/blob/master/modules/web/src/main/java/com/awesome/project/web/UserController.java#L31|31>"
        );
        assert_eq!(
            segments[1],
            "*Caused by: NotFoundException: user 7*\n\
             \t_UserRepository.load_ in core.user: \
             <https://git.example.com/awesome/blob/master/core-user/src/main/java/com/awesome/project/core/user/UserRepository.java#L19|19>\n\
             \t..."
        );
    }

    #[test]
    fn test_consecutive_foreign_frames_collapse_once() {
        let trace = "java.lang.RuntimeException: x
\tat org.a.A.a(A.java:1)
\tat org.b.B.b(B.java:2)
\tat org.c.C.c(C.java:3)";

        let segments = normalize(&fixtures::rules(), Some(trace), None);
        assert_eq!(segments, vec!["*RuntimeException: x*\n\t...".to_string()]);
    }

    #[test]
    fn test_single_foreign_frame() {
        let trace = "java.lang.RuntimeException: x\n\tat org.a.A.a(A.java:1)";
        let segments = normalize(&fixtures::rules(), Some(trace), None);
        assert_eq!(segments[0].matches("\t...").count(), 1);
    }

    #[test]
    fn test_unresolved_frame_links_to_search() {
        let mut settings = fixtures::settings();
        settings.module_mapping = vec![(r"com.awesome.project.core.(\w+)".to_string(), "$1".to_string())];
        let rules = Rules::from_settings(&settings).unwrap();

        let trace = "java.lang.RuntimeException: x\n\tat com.awesome.project.web.Api.call(Api.java:5)";
        let segments = normalize(&rules, Some(trace), None);

        assert_eq!(
            segments[0],
            "*RuntimeException: x*\n\
             \t_Api.call_ in web: <https://git.example.com/search?q=com/awesome/project/web/Api.java|5>"
        );
    }

    #[test]
    fn test_frame_in_package_root_has_no_package_suffix() {
        let trace = "java.lang.RuntimeException: x\n\tat com.awesome.project.Application.main(Application.java:12)";
        let segments = normalize(&fixtures::rules(), Some(trace), Some("1.0.0"));

        assert_eq!(
            segments[0],
            "*RuntimeException: x*\n\
             \t_Application.main_: \
             <https://git.example.com/awesome/blob/1.0.0/app/src/main/java/com/awesome/project/Application.java#L12|12>"
        );
    }

    #[test]
    fn test_packaging_data_is_dropped() {
        let trace = "java.lang.RuntimeException: x
\tat com.awesome.project.core.user.UserService.findById(UserService.java:42) ~[app.jar:1.0]
\tat com.awesome.project.web.UserController.get(UserController.java:31) [app.jar:1.0]";
        let segments = normalize(&fixtures::rules(), Some(trace), None);

        assert_eq!(
            segments[0],
            "*RuntimeException: x*\n\
             \t_UserService.findById_ in core.user: \
             <https://git.example.com/awesome/blob/master/core-user/src/main/java/com/awesome/project/core/user/UserService.java#L42|42>\n\
             \t_UserController.get_ in web: \
             <https://git.example.com/awesome/blob/master/modules/web/src/main/java/com/awesome/project/web/UserController.java#L31|31>"
        );
    }

    #[test]
    fn test_native_method_tail_is_kept() {
        let trace = "java.lang.RuntimeException: x\n\tat com.awesome.project.jni.Bridge.call(Native Method)";
        let segments = normalize(&fixtures::rules(), Some(trace), None);
        assert_eq!(
            segments[0],
            "*RuntimeException: x*\n\t_Bridge.call_ in jni (Native Method)"
        );
    }

    #[test]
    fn test_other_lines_pass_through() {
        let trace = "java.lang.RuntimeException: x
\tat org.a.A.a(A.java:1)
\tSuppressed: java.io.IOException: close failed

\t\t... 3 common frames omitted";

        let segments = normalize(&fixtures::rules(), Some(trace), None);
        assert_eq!(
            segments[0],
            "*RuntimeException: x*\n\t...\n\tSuppressed: java.io.IOException: close failed"
        );
    }

    #[test]
    fn test_frames_before_any_header() {
        let trace = "\tat org.a.A.a(A.java:1)\n\tat org.a.A.b(A.java:2)";
        let segments = normalize(&fixtures::rules(), Some(trace), None);
        assert_eq!(segments, vec!["\t...".to_string()]);
    }

    #[test]
    fn test_frame_steps() {
        assert_eq!(
            collapse_nested_classes("at Foo$$EnhancerBySpringCGLIB$$1a2b.run"),
            "at Foo$.run"
        );
        assert_eq!(strip_generated("at Foo.run(<generated>)"), "at Foo.run");
        assert_eq!(strip_generated("at Foo.run(Foo.java:1)"), "at Foo.run(Foo.java:1)");
    }
}
