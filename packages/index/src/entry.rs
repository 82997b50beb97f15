use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use storyloom_sort::Sortable;

/// Schema version of the served index
pub const INDEX_VERSION: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Story,
    Docs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySubtype {
    Story,
    Test,
}

/// One browsable unit of the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    pub name: String,
    pub import_path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<EntrySubtype>,
    /// Story a test entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
    /// Story files a docs entry depends on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories_imports: Option<Vec<String>>,
}

impl IndexEntry {
    pub fn is_docs(&self) -> bool {
        self.entry_type == EntryType::Docs
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl Sortable for IndexEntry {
    fn title(&self) -> &str {
        &self.title
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `{ v, entries }`, entries keyed by id in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryIndex {
    pub v: u32,
    pub entries: IndexMap<String, IndexEntry>,
}

impl Default for StoryIndex {
    fn default() -> Self {
        Self {
            v: INDEX_VERSION,
            entries: IndexMap::new(),
        }
    }
}

impl StoryIndex {
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose source is `import_path`, in display order
    pub fn entries_for<'a>(&'a self, import_path: &'a str) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.entries
            .values()
            .filter(move |entry| entry.import_path == import_path)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
