//! Per-file records and the entries assembled from them
//!
//! Each file contributes candidates; ids are claimed across files when an
//! index is produced. Higher-priority candidates (story and MDX entries)
//! replace lower-priority ones (autodocs) silently; between equals the first
//! file by path keeps the id and the other is reported as a collision.
//! Full and incremental builds both go through `upsert`/`remove`, so they
//! produce the same index for the same records.

use crate::diagnostics::IndexDiagnostic;
use crate::entry::{EntrySubtype, EntryType, IndexEntry, StoryIndex, INDEX_VERSION};
use crate::error::IndexResult;
use crate::graph::{refers_to, resolve_import, DependencyGraph};
use crate::indexer::{DocsRecord, IndexedFile, StoriesRecord};
use crate::options::{
    Autodocs, IndexOptions, ATTACHED_MDX_TAG, AUTODOCS_TAG, UNATTACHED_MDX_TAG,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use storyloom_compose::combine_tags;
use storyloom_csf::to_id;
use storyloom_sort::sort_entries;

const ENTRY_PRIORITY: u8 = 2;
const AUTODOCS_PRIORITY: u8 = 1;

#[derive(Debug, Clone)]
struct Candidate {
    entry: IndexEntry,
    priority: u8,
}

#[derive(Debug, Clone, Default)]
struct Assembled {
    candidates: Vec<Candidate>,
    diagnostics: Vec<IndexDiagnostic>,
}

/// An index plus what went wrong producing it
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub index: StoryIndex,
    pub diagnostics: Vec<IndexDiagnostic>,
    /// Entries are missing or misattributed
    pub degraded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    options: IndexOptions,
    records: BTreeMap<String, IndexedFile>,
    /// Latest failure per file; the record (if any) is the last good one
    failures: BTreeMap<String, IndexDiagnostic>,
    assembled: BTreeMap<String, Assembled>,
    graph: DependencyGraph,
}

impl IndexStore {
    pub fn new(options: IndexOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.records.contains_key(import_path)
    }

    pub fn record(&self, import_path: &str) -> Option<&IndexedFile> {
        self.records.get(import_path)
    }

    pub fn failure(&self, import_path: &str) -> Option<&IndexDiagnostic> {
        self.failures.get(import_path)
    }

    /// Every tracked file, indexed or failing
    pub fn tracked_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.records.keys().cloned().collect();
        for path in self.failures.keys() {
            if !self.records.contains_key(path) {
                files.push(path.clone());
            }
        }
        files.sort();
        files
    }

    /// Docs files referencing the file at `import_path`
    pub fn dependents(&self, import_path: &str) -> Vec<String> {
        self.graph.get_dependents(import_path)
    }

    /// Replace the record for one file. Returns the files whose entries were
    /// reassembled: the file itself and the docs pages referencing it.
    pub fn upsert(&mut self, import_path: &str, file: IndexedFile) -> Vec<String> {
        self.failures.remove(import_path);
        match &file {
            IndexedFile::Docs(docs) => self
                .graph
                .set_dependencies(import_path, docs_targets(import_path, docs)),
            IndexedFile::Stories(_) => self.graph.remove_file(import_path),
        }
        self.records.insert(import_path.to_string(), file);

        self.reassemble(import_path);
        let mut touched = vec![import_path.to_string()];
        touched.extend(self.reassemble_dependents(import_path));
        touched
    }

    /// Keep the last good record for the file and attach `diagnostic`
    pub fn record_failure(&mut self, import_path: &str, diagnostic: IndexDiagnostic) {
        tracing::debug!(
            file = import_path,
            retained = self.records.contains_key(import_path),
            "keeping last indexed entries after failure"
        );
        self.failures.insert(import_path.to_string(), diagnostic);
    }

    /// Drop a file and reassemble the docs pages that referenced it
    pub fn remove(&mut self, import_path: &str) -> Vec<String> {
        self.records.remove(import_path);
        self.failures.remove(import_path);
        self.assembled.remove(import_path);
        self.graph.remove_file(import_path);
        self.reassemble_dependents(import_path)
    }

    /// Claim ids across files and sort into display order
    pub fn build(&self) -> IndexResult<BuildReport> {
        let mut diagnostics: Vec<IndexDiagnostic> = self.failures.values().cloned().collect();
        let mut owners: IndexMap<String, Candidate> = IndexMap::new();

        for assembled in self.assembled.values() {
            diagnostics.extend(assembled.diagnostics.iter().cloned());

            for candidate in &assembled.candidates {
                match owners.get_mut(&candidate.entry.id) {
                    None => {
                        owners.insert(candidate.entry.id.clone(), candidate.clone());
                    }
                    Some(current) if candidate.priority > current.priority => {
                        *current = candidate.clone();
                    }
                    Some(current) if candidate.priority < current.priority => {}
                    Some(current) => diagnostics.push(IndexDiagnostic::Collision {
                        id: candidate.entry.id.clone(),
                        first: current.entry.import_path.clone(),
                        second: candidate.entry.import_path.clone(),
                    }),
                }
            }
        }

        let entries: Vec<IndexEntry> = owners.into_values().map(|c| c.entry).collect();
        let sorted = sort_entries(entries, &self.options.story_sort)?;

        let degraded = diagnostics.iter().any(IndexDiagnostic::degrades);
        Ok(BuildReport {
            index: StoryIndex {
                v: INDEX_VERSION,
                entries: sorted
                    .into_iter()
                    .map(|entry| (entry.id.clone(), entry))
                    .collect(),
            },
            diagnostics,
            degraded,
        })
    }

    fn reassemble_dependents(&mut self, import_path: &str) -> Vec<String> {
        let dependents = self.graph.get_dependents(import_path);
        for dependent in &dependents {
            if dependent != import_path {
                self.reassemble(dependent);
            }
        }
        dependents
    }

    fn reassemble(&mut self, import_path: &str) {
        let assembled = match self.records.get(import_path) {
            Some(IndexedFile::Stories(record)) => self.assemble_stories(import_path, record),
            Some(IndexedFile::Docs(record)) => self.assemble_docs(import_path, record),
            None => {
                self.assembled.remove(import_path);
                return;
            }
        };
        self.assembled.insert(import_path.to_string(), assembled);
    }

    fn assemble_stories(&self, import_path: &str, record: &StoriesRecord) -> Assembled {
        let base_tags = self.options.base_tags();
        let mut assembled = Assembled::default();
        let mut entries = Vec::new();

        for story in &record.stories {
            let tags = combine_tags([
                base_tags.as_slice(),
                record.meta_tags.as_slice(),
                story.tags.as_slice(),
            ]);

            entries.push(IndexEntry {
                id: story.id.clone(),
                title: record.title.clone(),
                name: story.name.clone(),
                import_path: import_path.to_string(),
                entry_type: EntryType::Story,
                subtype: Some(EntrySubtype::Story),
                parent: None,
                tags: tags.clone(),
                export_name: Some(story.export_name.clone()),
                stories_imports: None,
            });

            for test in &story.tests {
                entries.push(IndexEntry {
                    id: test.id.clone(),
                    title: record.title.clone(),
                    name: test.name.clone(),
                    import_path: import_path.to_string(),
                    entry_type: EntryType::Story,
                    subtype: Some(EntrySubtype::Test),
                    parent: Some(story.id.clone()),
                    tags: combine_tags([tags.as_slice(), test.tags.as_slice()]),
                    export_name: Some(story.export_name.clone()),
                    stories_imports: None,
                });
            }
        }

        let wants_autodocs = match self.options.docs.autodocs {
            Autodocs::Always => !entries.is_empty(),
            Autodocs::Never => false,
            Autodocs::Tag => entries.iter().any(|entry| {
                entry.subtype == Some(EntrySubtype::Story) && entry.has_tag(AUTODOCS_TAG)
            }),
        };

        if wants_autodocs {
            let name = &self.options.docs.default_name;
            let base = record.meta_id.as_deref().unwrap_or(&record.title);
            let autodocs_tag = [AUTODOCS_TAG.to_string()];
            match to_id(base, Some(name)) {
                Ok(id) => assembled.candidates.push(Candidate {
                    entry: IndexEntry {
                        id,
                        title: record.title.clone(),
                        name: name.clone(),
                        import_path: import_path.to_string(),
                        entry_type: EntryType::Docs,
                        subtype: None,
                        parent: None,
                        tags: combine_tags([
                            base_tags.as_slice(),
                            record.meta_tags.as_slice(),
                            autodocs_tag.as_slice(),
                        ]),
                        export_name: None,
                        stories_imports: Some(Vec::new()),
                    },
                    priority: AUTODOCS_PRIORITY,
                }),
                Err(e) => assembled.diagnostics.push(IndexDiagnostic::Parse {
                    file: import_path.to_string(),
                    message: e.to_string(),
                    location: None,
                }),
            }
        }

        assembled
            .candidates
            .extend(entries.into_iter().map(|entry| Candidate {
                entry,
                priority: ENTRY_PRIORITY,
            }));
        assembled
    }

    fn assemble_docs(&self, import_path: &str, record: &DocsRecord) -> Assembled {
        let mut assembled = Assembled::default();
        if record.is_template {
            return assembled;
        }

        let mut stories_imports: Vec<String> = Vec::new();
        let mut attached: Option<&StoriesRecord> = None;

        if let Some(of) = &record.of {
            match resolve_import(import_path, of).and_then(|resolved| self.find_stories(&resolved)) {
                Some((path, stories)) => {
                    if stories.stories.is_empty() {
                        assembled.diagnostics.push(broken_reference(import_path, of));
                    }
                    attached = Some(stories);
                    stories_imports.push(path.to_string());
                }
                None => assembled.diagnostics.push(broken_reference(import_path, of)),
            }
        }

        for source in &record.imports {
            if record.of.as_ref() == Some(source) {
                continue;
            }
            let Some(resolved) = resolve_import(import_path, source) else {
                continue;
            };
            match self.find_stories(&resolved) {
                Some((path, stories)) => {
                    if stories.stories.is_empty() {
                        assembled.diagnostics.push(broken_reference(import_path, source));
                    }
                    if !stories_imports.iter().any(|p| p == path) {
                        stories_imports.push(path.to_string());
                    }
                }
                None if looks_like_story_file(&resolved) => {
                    assembled.diagnostics.push(broken_reference(import_path, source))
                }
                None => {}
            }
        }

        let title = match attached {
            Some(stories) => stories.title.clone(),
            None => match &record.title {
                Some(title) => title.clone(),
                None => {
                    assembled.diagnostics.push(IndexDiagnostic::Parse {
                        file: import_path.to_string(),
                        message: format!("{}: unable to determine a title for docs page", import_path),
                        location: None,
                    });
                    return assembled;
                }
            },
        };
        let name = record
            .name
            .clone()
            .unwrap_or_else(|| self.options.docs.default_name.clone());
        let base = attached
            .and_then(|stories| stories.meta_id.as_deref())
            .unwrap_or(&title);

        let id = match to_id(base, Some(&name)) {
            Ok(id) => id,
            Err(e) => {
                assembled.diagnostics.push(IndexDiagnostic::Parse {
                    file: import_path.to_string(),
                    message: e.to_string(),
                    location: None,
                });
                return assembled;
            }
        };

        let base_tags = self.options.base_tags();
        let meta_tags: &[String] = attached
            .map(|stories| stories.meta_tags.as_slice())
            .unwrap_or_default();
        let mdx_tag = [if attached.is_some() {
            ATTACHED_MDX_TAG
        } else {
            UNATTACHED_MDX_TAG
        }
        .to_string()];

        assembled.candidates.push(Candidate {
            entry: IndexEntry {
                id,
                title,
                name,
                import_path: import_path.to_string(),
                entry_type: EntryType::Docs,
                subtype: None,
                parent: None,
                tags: combine_tags([base_tags.as_slice(), meta_tags, mdx_tag.as_slice()]),
                export_name: None,
                stories_imports: Some(stories_imports),
            },
            priority: ENTRY_PRIORITY,
        });
        assembled
    }

    fn find_stories(&self, resolved: &str) -> Option<(&str, &StoriesRecord)> {
        self.records.iter().find_map(|(path, file)| match file {
            IndexedFile::Stories(record) if refers_to(resolved, path) => Some((path.as_str(), record)),
            _ => None,
        })
    }
}

fn docs_targets(import_path: &str, docs: &DocsRecord) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for source in docs.of.iter().chain(&docs.imports) {
        if let Some(resolved) = resolve_import(import_path, source) {
            if !targets.contains(&resolved) {
                targets.push(resolved);
            }
        }
    }
    targets
}

fn looks_like_story_file(resolved: &str) -> bool {
    let file_name = resolved.rsplit('/').next().unwrap_or(resolved);
    file_name.contains(".stories") || file_name.contains(".story")
}

fn broken_reference(docs_file: &str, reference: &str) -> IndexDiagnostic {
    IndexDiagnostic::BrokenReference {
        docs_file: docs_file.to_string(),
        reference: reference.to_string(),
    }
}
