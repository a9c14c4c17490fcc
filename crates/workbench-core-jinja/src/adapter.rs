//! Free-text error extraction.
//!
//! The template engine and the JSON parser report some facts only inside their message text.
//! Every pattern that digs those facts back out lives here, so the rest of the crate deals in
//! structured values only.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;
use workbench_core::Variables;

static QUOTED_UNDEFINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'([A-Za-z_][A-Za-z0-9_]*)' is undefined").expect("valid pattern")
});

static MISSING_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"has no attribute '([A-Za-z_][A-Za-z0-9_]*)'").expect("valid pattern")
});

/// Where the expression part of a span ends: the first filter pipe or `is` test.
static EXPRESSION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\||\bis\b").expect("valid pattern"));

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*""#).expect("valid pattern"));

/// A variable path: a root identifier followed by `.attr` and `[key]` lookups.
static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"[A-Za-z_][A-Za-z0-9_]*(?:\s*\.\s*[A-Za-z_][A-Za-z0-9_]*|\s*\[\s*(?:'[^']*'|"[^"]*"|\d+)\s*\])*"#,
    )
    .expect("valid pattern")
});

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^([A-Za-z_][A-Za-z0-9_]*)|\.\s*([A-Za-z_][A-Za-z0-9_]*)|\[\s*(?:'([^']*)'|"([^"]*)"|(\d+))\s*\]"#,
    )
    .expect("valid pattern")
});

static LOCATION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:at line \d+ column \d+|\(<unknown>, line \d+\))\s*$").expect("valid pattern")
});

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "if", "else", "true", "false", "none", "True", "False", "None",
];

/// Names a failed render could see.
///
/// The default binds nothing and treats every name as a template input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bindings<'a> {
    variables: Option<&'a Variables>,
    inputs: Option<&'a HashSet<String>>,
}

impl<'a> Bindings<'a> {
    /// Bindings of a render that was given `variables`.
    pub fn new(variables: &'a Variables) -> Self {
        Self {
            variables: Some(variables),
            inputs: None,
        }
    }

    /// Restrict template inputs to `inputs`; any other name was bound by the template itself.
    pub fn with_inputs(mut self, inputs: &'a HashSet<String>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    fn value(&self, name: &str) -> Option<&'a Value> {
        self.variables.and_then(|variables| variables.get(name))
    }

    fn is_local(&self, name: &str) -> bool {
        self.inputs.is_some_and(|inputs| !inputs.contains(name))
    }
}

#[derive(Clone, Copy)]
enum Segment<'s> {
    Key(&'s str),
    Index(usize),
}

/// Name of the variable an undefined-value failure is about.
///
/// Looks for `'<name>' is undefined` or `has no attribute '<name>'` in `message`. Failing that,
/// walks the variable paths of `blamed` (the source the renderer pointed at, filters and tests
/// dropped) against `bindings`: an unbound root is the answer, otherwise the first lookup that
/// does not resolve.
pub fn undefined_name(
    message: &str,
    blamed: Option<&str>,
    bindings: &Bindings<'_>,
) -> Option<String> {
    for pattern in [&*QUOTED_UNDEFINED, &*MISSING_ATTRIBUTE] {
        if let Some(caps) = pattern.captures(message) {
            return Some(caps[1].to_string());
        }
    }

    let blamed = blamed?;
    let expression = match EXPRESSION_END.find(blamed) {
        Some(end) => &blamed[..end.start()],
        None => blamed,
    };
    let literals: Vec<Range<usize>> = STRING_LITERAL
        .find_iter(expression)
        .map(|found| found.range())
        .collect();

    PATH.find_iter(expression)
        .filter(|path| !literals.iter().any(|literal| literal.contains(&path.start())))
        .filter(|path| !expression[..path.start()].ends_with('.'))
        .filter_map(|path| unresolved_segment(path.as_str(), bindings))
        .next()
}

/// First segment of `path` that does not resolve, if any.
fn unresolved_segment(path: &str, bindings: &Bindings<'_>) -> Option<String> {
    let mut segments = SEGMENT.captures_iter(path).filter_map(|caps| {
        if let Some(name) = caps.get(1).or(caps.get(2)).or(caps.get(3)).or(caps.get(4)) {
            Some((Segment::Key(name.as_str()), caps.get(0)?.end()))
        } else {
            let index = caps.get(5)?.as_str().parse().ok()?;
            Some((Segment::Index(index), caps.get(0)?.end()))
        }
    });

    let (Segment::Key(root), _) = segments.next()? else {
        return None;
    };
    if KEYWORDS.contains(&root) {
        return None;
    }

    let Some(mut current) = bindings.value(root) else {
        if bindings.is_local(root) {
            return segments.next().map(|(segment, end)| match segment {
                Segment::Key(key) => key.to_string(),
                Segment::Index(_) => compact(&path[..end]),
            });
        }
        return Some(root.to_string());
    };

    for (segment, end) in segments {
        let next = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(index), Value::Array(items)) => items.get(index),
            _ => None,
        };
        match (next, segment) {
            (Some(value), _) => current = value,
            (None, Segment::Key(key)) => return Some(key.to_string()),
            (None, Segment::Index(_)) => return Some(compact(&path[..end])),
        }
    }
    None
}

fn compact(path: &str) -> String {
    path.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The expression a failure at `range` of `source` is about.
///
/// A span covering only a filter or test name is widened back to the start of its tag, so the
/// filtered value is what gets examined.
pub fn blamed_expression(source: &str, range: Range<usize>) -> Option<&str> {
    let before = source.get(..range.start)?;
    if before.trim_end().ends_with('|') || before.trim_end().ends_with(" is") {
        let tag_start = before
            .rfind("{{")
            .max(before.rfind("{%"))
            .map_or(0, |index| index + 2);
        return before.get(tag_start..);
    }
    source.get(range)
}

/// `message` without a trailing `at line N column M` location.
pub fn strip_location_suffix(message: &str) -> &str {
    match LOCATION_SUFFIX.find(message) {
        Some(found) => &message[..found.start()],
        None => message,
    }
}

/// 1-based (line, column) of byte offset `offset` in `source`, counting columns in chars.
///
/// Offsets past the end or inside a multi-byte char are clamped to the nearest boundary before.
pub fn position_of(source: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
