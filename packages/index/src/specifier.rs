//! Normalised `stories` entries
//!
//! A specifier is a directory plus a files pattern. Import paths
//! (`./src/Button.stories.tsx`) are matched against the files pattern
//! relative to the directory.

use crate::error::{IndexError, IndexResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyloom_common::normalize_path;

pub const DEFAULT_FILES_PATTERN: &str = "**/*.@(mdx|stories.@(js|jsx|mjs|ts|tsx))";

const MAGIC_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '(', ')', '!', '+', '@'];

/// A `stories` entry as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoriesEntry {
    Glob(String),
    #[serde(rename_all = "camelCase")]
    Specifier {
        directory: String,
        #[serde(default)]
        files: Option<String>,
        #[serde(default)]
        title_prefix: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct NormalizedSpecifier {
    /// Import-path style directory: `.`, `./src` or `../lib`
    pub directory: String,
    pub files: String,
    pub title_prefix: String,
    matcher: GlobSet,
}

impl PartialEq for NormalizedSpecifier {
    fn eq(&self, other: &Self) -> bool {
        self.directory == other.directory
            && self.files == other.files
            && self.title_prefix == other.title_prefix
    }
}

impl NormalizedSpecifier {
    pub fn new(entry: &StoriesEntry) -> IndexResult<Self> {
        let (directory, files, title_prefix) = match entry {
            StoriesEntry::Glob(pattern) => {
                let (directory, files) = split_glob(pattern);
                (
                    directory,
                    files.unwrap_or_else(|| DEFAULT_FILES_PATTERN.to_string()),
                    String::new(),
                )
            }
            StoriesEntry::Specifier {
                directory,
                files,
                title_prefix,
            } => (
                directory.clone(),
                files
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FILES_PATTERN.to_string()),
                title_prefix
                    .as_deref()
                    .unwrap_or_default()
                    .trim_matches('/')
                    .to_string(),
            ),
        };

        let matcher = build_matcher(&files).map_err(|message| IndexError::InvalidSpecifier {
            pattern: files.clone(),
            message,
        })?;

        Ok(Self {
            directory: normalize_directory(&directory),
            files,
            title_prefix,
            matcher,
        })
    }

    /// Import path relative to the specifier directory, if it lies inside it
    pub fn relative<'a>(&self, import_path: &'a str) -> Option<&'a str> {
        if self.directory == "." {
            return import_path.strip_prefix("./");
        }
        import_path
            .strip_prefix(self.directory.as_str())?
            .strip_prefix('/')
    }

    pub fn matches(&self, import_path: &str) -> bool {
        self.relative(import_path)
            .map_or(false, |relative| self.matcher.is_match(relative))
    }

    pub fn absolute_directory(&self, root: &Path) -> PathBuf {
        normalize_path(&root.join(&self.directory))
    }
}

/// Split a glob into its literal directory prefix and the pattern below it
fn split_glob(pattern: &str) -> (String, Option<String>) {
    let trimmed = pattern.trim();
    let segments: Vec<&str> = trimmed.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|segment| !segment.contains(MAGIC_CHARS))
        .count();

    if literal == segments.len() {
        return (trimmed.to_string(), None);
    }
    (
        segments[..literal].join("/"),
        Some(segments[literal..].join("/")),
    )
}

fn normalize_directory(directory: &str) -> String {
    let mut directory = directory.trim().trim_end_matches('/');
    while let Some(rest) = directory.strip_prefix("./") {
        directory = rest;
    }
    if directory.is_empty() || directory == "." {
        ".".to_string()
    } else if directory.starts_with("..") {
        directory.to_string()
    } else {
        format!("./{}", directory)
    }
}

fn build_matcher(files: &str) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pattern in expand_alternates(files)? {
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| e.to_string())?;
        builder.add(glob);
    }
    builder.build().map_err(|e| e.to_string())
}

/// Expand `{a,b}`, `@(a|b)` and `?(a)` groups, nested or not, into plain
/// glob alternatives
pub fn expand_alternates(pattern: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = pattern.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let (open_len, optional) = match c {
            '{' => (1, false),
            '@' | '?' | '+' | '!' if chars.get(i + 1) == Some(&'(') => match c {
                '@' => (2, false),
                '?' => (2, true),
                other => return Err(format!("unsupported pattern group '{}('", other)),
            },
            _ => continue,
        };

        let open = i + open_len - 1;
        let close = find_close(&chars, open)?;
        let prefix: String = chars[..i].iter().collect();
        let inner: String = chars[open + 1..close].iter().collect();
        let suffix: String = chars[close + 1..].iter().collect();

        let mut alternatives = split_top_level(&inner);
        if optional {
            alternatives.push(String::new());
        }

        let mut expanded = Vec::new();
        for alternative in alternatives {
            expanded.extend(expand_alternates(&format!(
                "{}{}{}",
                prefix, alternative, suffix
            ))?);
        }
        return Ok(expanded);
    }

    Ok(vec![pattern.to_string()])
}

fn find_close(chars: &[char], open: usize) -> Result<usize, String> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err("unbalanced pattern group".to_string())
}

fn split_top_level(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '{' | '(' => {
                depth += 1;
                current.push(c);
            }
            '}' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | '|' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}
