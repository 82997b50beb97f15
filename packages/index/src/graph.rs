/// Docs dependency graph
///
/// Tracks which story modules each docs page references, keyed by the
/// resolved import (with or without extension), so a change to a story file
/// can find the docs entries that need reassembling.
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    /// Docs import path -> resolved imports
    dependencies: BTreeMap<String, Vec<String>>,

    /// Reverse lookup: resolved import -> docs import paths referencing it
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all dependencies for a file at once
    pub fn set_dependencies(&mut self, source: &str, targets: Vec<String>) {
        self.remove_file(source);

        for target in &targets {
            self.dependents
                .entry(target.clone())
                .or_default()
                .insert(source.to_string());
        }

        if !targets.is_empty() {
            self.dependencies.insert(source.to_string(), targets);
        }
    }

    /// Forget the outgoing edges of `source`
    pub fn remove_file(&mut self, source: &str) {
        if let Some(old_targets) = self.dependencies.remove(source) {
            for old_target in old_targets {
                if let Some(sources) = self.dependents.get_mut(&old_target) {
                    sources.remove(source);
                    if sources.is_empty() {
                        self.dependents.remove(&old_target);
                    }
                }
            }
        }
    }

    pub fn get_dependencies(&self, source: &str) -> Option<&[String]> {
        self.dependencies.get(source).map(|v| v.as_slice())
    }

    /// Files that reference the module at `import_path`, in path order
    pub fn get_dependents(&self, import_path: &str) -> Vec<String> {
        let mut sources = BTreeSet::new();
        for key in [import_path.to_string(), module_key(import_path)] {
            if let Some(found) = self.dependents.get(&key) {
                sources.extend(found.iter().cloned());
            }
        }
        sources.into_iter().collect()
    }
}

/// Whether an import resolved to `resolved` refers to the file at `import_path`
pub fn refers_to(resolved: &str, import_path: &str) -> bool {
    resolved == import_path || module_key(import_path) == resolved
}

/// An import path with its last extension dropped
pub fn module_key(import_path: &str) -> String {
    let file_start = import_path.rfind('/').map_or(0, |slash| slash + 1);
    match import_path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => import_path[..file_start + dot].to_string(),
        _ => import_path.to_string(),
    }
}

/// Resolve an import `source` written in the file at `from` against the
/// project root. Bare package imports resolve to `None`.
pub fn resolve_import(from: &str, source: &str) -> Option<String> {
    if !source.starts_with("./") && !source.starts_with("../") {
        return None;
    }

    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    let mut leading_parents = 0usize;

    for segment in source.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != "." && last != ".." => {
                    parts.pop();
                }
                _ => leading_parents += 1,
            },
            other => parts.push(other),
        }
    }

    parts.retain(|part| *part != ".");
    let mut resolved: Vec<&str> = vec![".."; leading_parents];
    resolved.extend(parts);

    let joined = resolved.join("/");
    if joined.starts_with("..") {
        Some(joined)
    } else {
        Some(format!("./{}", joined))
    }
}
