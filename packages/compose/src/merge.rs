//! Merge rules shared by every annotation key

use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Objects merge key by key; anything else replaces
    #[default]
    DeepMerge,
    /// The later value replaces the earlier one wholesale
    Replace,
}

/// Strategy overrides keyed by dotted key path (`"backgrounds.values"`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStrategies {
    paths: BTreeMap<String, MergeStrategy>,
}

impl MergeStrategies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, strategy: MergeStrategy) {
        self.paths.insert(path.into(), strategy);
    }

    pub fn get(&self, path: &str) -> MergeStrategy {
        self.paths.get(path).copied().unwrap_or_default()
    }
}

/// Merge `source` into `target` recursively
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    merge_at(target, source, "", &MergeStrategies::default());
}

/// Merge `source` into `target` recursively, honouring per-path strategies
pub fn deep_merge_with(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    strategies: &MergeStrategies,
) {
    merge_at(target, source, "", strategies);
}

fn merge_at(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    prefix: &str,
    strategies: &MergeStrategies,
) {
    for (key, value) in source {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming))
                if strategies.get(&path) == MergeStrategy::DeepMerge =>
            {
                merge_at(existing, incoming, &path, strategies);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Args merge by top-level key only
pub fn merge_args(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Union of tag lists in first-seen order. `!tag` removes `tag` and is not
/// itself kept.
pub fn combine_tags<'a, I>(tag_sets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut tags: Vec<String> = Vec::new();
    for set in tag_sets {
        for tag in set {
            match tag.strip_prefix('!') {
                Some(negated) => tags.retain(|t| t != negated),
                None => {
                    if !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
            }
        }
    }
    tags
}
