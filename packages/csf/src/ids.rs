//! Entry id derivation and export naming

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid {part} '{value}', must include alphanumeric characters")]
pub struct IdError {
    pub part: &'static str,
    pub value: String,
}

/// Lowercase and replace punctuation and whitespace with single dashes
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.chars().flat_map(char::to_lowercase) {
        if is_separator(c) {
            pending_dash = true;
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push(c);
    }

    out
}

fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\u{2019}'
                | '`'
                | '~'
                | '!'
                | '@'
                | '#'
                | '$'
                | '%'
                | '^'
                | '&'
                | '*'
                | '('
                | ')'
                | '_'
                | '|'
                | '+'
                | '-'
                | '='
                | '?'
                | ';'
                | ':'
                | '\''
                | '"'
                | ','
                | '.'
                | '<'
                | '>'
                | '{'
                | '}'
                | '['
                | ']'
                | '\\'
                | '/'
        )
}

fn sanitize_safe(value: &str, part: &'static str) -> Result<String, IdError> {
    let sanitized = sanitize(value);
    if sanitized.is_empty() {
        return Err(IdError {
            part,
            value: value.to_string(),
        });
    }
    Ok(sanitized)
}

/// `"Example/Button"` + `"Primary"` -> `"example-button--primary"`
pub fn to_id(kind: &str, name: Option<&str>) -> Result<String, IdError> {
    let kind = sanitize_safe(kind, "kind")?;
    match name {
        Some(name) => Ok(format!("{}--{}", kind, sanitize_safe(name, "name")?)),
        None => Ok(kind),
    }
}

/// Id of a test attached to a story: `"<story id>:<test name>"`
pub fn to_test_id(story_id: &str, test_name: &str) -> Result<String, IdError> {
    Ok(format!("{}:{}", story_id, sanitize_safe(test_name, "test")?))
}

/// Display name for an export: `"primaryButton"` -> `"Primary Button"`
pub fn story_name_from_export(key: &str) -> String {
    words(key)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split an identifier into words at separators, case changes and
/// letter/digit boundaries
fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.map_or(false, char::is_lowercase));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `includeStories` / `excludeStories` value: a list of export names or a pattern
#[derive(Debug, Clone)]
pub enum ExportMatcher {
    Names(Vec<String>),
    Pattern(Regex),
}

impl ExportMatcher {
    /// Build from a JavaScript regex literal body and flags
    pub fn from_js_regex(pattern: &str, flags: &str) -> Result<Self, regex::Error> {
        let mut prefix = String::new();
        for flag in flags.chars().filter(|f| matches!(f, 'i' | 'm' | 's')) {
            prefix.push(flag);
        }
        let source = if prefix.is_empty() {
            pattern.to_string()
        } else {
            format!("(?{}){}", prefix, pattern)
        };
        Ok(Self::Pattern(Regex::new(&source)?))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            ExportMatcher::Names(names) => names.iter().any(|n| n == key),
            ExportMatcher::Pattern(re) => re.is_match(key),
        }
    }
}

impl PartialEq for ExportMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExportMatcher::Names(a), ExportMatcher::Names(b)) => a == b,
            (ExportMatcher::Pattern(a), ExportMatcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Whether a named export is a story under the meta's include/exclude filters
pub fn is_export_story(
    key: &str,
    include: Option<&ExportMatcher>,
    exclude: Option<&ExportMatcher>,
) -> bool {
    key != "__esModule"
        && include.map_or(true, |m| m.matches(key))
        && exclude.map_or(true, |m| !m.matches(key))
}
