//! Discovery and full index builds

use crate::diagnostics::IndexDiagnostic;
use crate::error::{IndexError, IndexResult};
use crate::indexer::{default_indexers, IndexedFile, Indexer, IndexerContext};
use crate::options::IndexOptions;
use crate::specifier::{NormalizedSpecifier, StoriesEntry};
use crate::store::{BuildReport, IndexStore};
use crate::title::auto_title;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyloom_common::{normalize_path, to_import_path, FileSystem};

/// Turns configured `stories` entries into an index
pub struct StoryIndexGenerator {
    root: PathBuf,
    specifiers: Vec<NormalizedSpecifier>,
    indexers: Vec<Box<dyn Indexer>>,
    options: IndexOptions,
    fs: Arc<dyn FileSystem>,
}

impl StoryIndexGenerator {
    pub fn new(
        root: impl Into<PathBuf>,
        stories: &[StoriesEntry],
        options: IndexOptions,
        fs: Arc<dyn FileSystem>,
    ) -> IndexResult<Self> {
        let specifiers = stories
            .iter()
            .map(NormalizedSpecifier::new)
            .collect::<IndexResult<Vec<_>>>()?;

        Ok(Self {
            root: root.into(),
            specifiers,
            indexers: default_indexers(),
            options,
            fs,
        })
    }

    /// Replace the indexers; the first one accepting a file wins
    pub fn with_indexers(mut self, indexers: Vec<Box<dyn Indexer>>) -> Self {
        self.indexers = indexers;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn specifiers(&self) -> &[NormalizedSpecifier] {
        &self.specifiers
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn import_path(&self, path: &Path) -> String {
        to_import_path(&self.root, path)
    }

    pub fn absolute_path(&self, import_path: &str) -> PathBuf {
        normalize_path(&self.root.join(import_path))
    }

    /// First specifier matching `import_path`
    pub fn specifier_for(&self, import_path: &str) -> Option<&NormalizedSpecifier> {
        self.specifiers.iter().find(|s| s.matches(import_path))
    }

    /// Directories that exist and will be walked
    pub fn resolvable_directories(&self) -> Vec<PathBuf> {
        self.specifiers
            .iter()
            .map(|specifier| specifier.absolute_directory(&self.root))
            .filter(|directory| self.fs.exists(directory))
            .collect()
    }

    /// Every matching file as an import path, sorted and deduplicated
    pub fn discover(&self) -> IndexResult<Vec<String>> {
        let mut found = Vec::new();

        for specifier in &self.specifiers {
            let directory = specifier.absolute_directory(&self.root);
            if !self.fs.exists(&directory) {
                tracing::warn!(directory = %directory.display(), "stories directory does not exist");
                continue;
            }

            let files = self.fs.walk_files(&directory).map_err(|source| IndexError::Io {
                path: directory.display().to_string(),
                source,
            })?;

            found.extend(
                files
                    .iter()
                    .map(|path| self.import_path(path))
                    .filter(|import_path| specifier.matches(import_path)),
            );
        }

        found.sort();
        found.dedup();
        Ok(found)
    }

    /// Read and index one file
    pub fn index_file(&self, import_path: &str) -> Result<IndexedFile, IndexDiagnostic> {
        let source = self.read_source(import_path)?;
        self.index_source(import_path, &source)
    }

    pub fn read_source(&self, import_path: &str) -> Result<String, IndexDiagnostic> {
        let path = self.absolute_path(import_path);
        self.fs.read_to_string(&path).map_err(|source| {
            let error = IndexError::Io {
                path: import_path.to_string(),
                source,
            };
            IndexDiagnostic::Parse {
                file: import_path.to_string(),
                message: error.to_string(),
                location: None,
            }
        })
    }

    /// Whether the file at `import_path` still exists
    pub fn exists(&self, import_path: &str) -> bool {
        self.fs.exists(&self.absolute_path(import_path))
    }

    /// Index already-read contents of the file at `import_path`
    pub fn index_source(&self, import_path: &str, source: &str) -> Result<IndexedFile, IndexDiagnostic> {
        let indexer = self
            .indexers
            .iter()
            .find(|indexer| indexer.test(import_path))
            .ok_or_else(|| IndexDiagnostic::NoIndexer {
                file: import_path.to_string(),
            })?;

        let specifier = self.specifier_for(import_path);
        let make_title = |user_title: Option<&str>| -> Option<String> {
            match specifier {
                Some(specifier) => auto_title(import_path, specifier, user_title),
                None => user_title.map(str::to_string),
            }
        };
        let context = IndexerContext {
            import_path,
            make_title: &make_title,
        };

        tracing::debug!(file = import_path, indexer = indexer.name(), "indexing file");
        indexer
            .index(source, &context)
            .map_err(|error| IndexDiagnostic::parse(import_path, &error))
    }

    pub fn new_store(&self) -> IndexStore {
        IndexStore::new(self.options.clone())
    }

    /// Index every discovered file into a fresh store. Files that fail are
    /// left out.
    pub fn build_store(&self) -> IndexResult<IndexStore> {
        let mut store = self.new_store();
        for import_path in self.discover()? {
            match self.index_file(&import_path) {
                Ok(file) => {
                    store.upsert(&import_path, file);
                }
                Err(diagnostic) => {
                    tracing::warn!(file = %import_path, "{}", diagnostic);
                    store.record_failure(&import_path, diagnostic);
                }
            }
        }
        Ok(store)
    }

    pub fn build(&self) -> IndexResult<BuildReport> {
        let report = self.build_store()?.build()?;
        tracing::info!(
            entries = report.index.len(),
            diagnostics = report.diagnostics.len(),
            degraded = report.degraded,
            "built story index"
        );
        Ok(report)
    }
}
