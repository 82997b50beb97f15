//! Live story index
//!
//! Keeps the index current as files change. Re-parses run off the async
//! runtime and may overlap; each batch is committed under one lock and then
//! published as a new immutable snapshot, so readers see either the old or
//! the new entries of a file, never a mix.

use crate::channel::ServerChannel;
use crate::watcher::WatchEvent;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use storyloom_index::{
    IndexDiagnostic, IndexError, IndexStore, IndexedFile, StoryIndex, StoryIndexGenerator,
};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("re-parse task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Unparsed,
    Parsed,
    /// Changed on disk, re-parse pending
    Stale,
    /// Last parse failed; earlier entries, if any, are still served
    Failed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileState {
    pub status: FileStatus,
    /// Bumped on every scheduled change; a parse result is only committed if
    /// its generation is still current
    pub generation: u64,
    pub hash: Option<u32>,
}

/// Immutable published state
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: Arc<StoryIndex>,
    pub diagnostics: Vec<IndexDiagnostic>,
    pub degraded: bool,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            index: Arc::new(StoryIndex::default()),
            diagnostics: Vec::new(),
            degraded: false,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Upsert,
    Remove,
}

/// A change scheduled against a generation
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    import_path: String,
    generation: u64,
    change: Change,
    previous_hash: Option<u32>,
}

#[derive(Debug)]
enum Outcome {
    Unchanged,
    Parsed { hash: u32, file: IndexedFile },
    Failed { hash: Option<u32>, diagnostic: IndexDiagnostic },
    Removed,
}

#[derive(Debug)]
pub(crate) struct Prepared {
    import_path: String,
    generation: u64,
    outcome: Outcome,
}

struct CacheState {
    store: IndexStore,
    files: HashMap<String, FileState>,
}

pub struct IndexCache {
    generator: Arc<StoryIndexGenerator>,
    state: Mutex<CacheState>,
    snapshot: RwLock<Arc<Snapshot>>,
    channel: Option<ServerChannel>,
}

impl IndexCache {
    pub fn new(generator: Arc<StoryIndexGenerator>) -> Self {
        let store = generator.new_store();
        Self {
            generator,
            state: Mutex::new(CacheState {
                store,
                files: HashMap::new(),
            }),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            channel: None,
        }
    }

    /// Announce every published snapshot on `channel`
    pub fn with_channel(mut self, channel: ServerChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn generator(&self) -> &StoryIndexGenerator {
        &self.generator
    }

    /// Discover and index every file
    pub async fn initialize(&self) -> CacheResult<Arc<Snapshot>> {
        let files = self.generator.discover()?;
        tracing::info!(files = files.len(), "indexing story files");

        let pending = {
            let mut state = self.state.lock().await;
            files
                .into_iter()
                .map(|import_path| take_generation(&mut state.files, import_path, Change::Upsert))
                .collect::<Vec<_>>()
        };

        let prepared = self.prepare_all(pending).await?;
        self.commit(prepared, true).await?;
        Ok(self.snapshot())
    }

    /// Current index
    pub fn get(&self) -> Arc<StoryIndex> {
        self.snapshot().index.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn status(&self, import_path: &str) -> Option<FileState> {
        self.state.lock().await.files.get(import_path).cloned()
    }

    /// Re-read one file now, bypassing the watcher
    pub async fn invalidate(&self, path: &Path) -> CacheResult<bool> {
        self.apply(vec![WatchEvent::Changed(path.to_path_buf())]).await
    }

    /// Apply a batch of file system events. Returns whether a new snapshot
    /// was published.
    pub async fn apply(&self, events: Vec<WatchEvent>) -> CacheResult<bool> {
        let pending = self.schedule(events).await;
        if pending.is_empty() {
            return Ok(false);
        }
        let prepared = self.prepare_all(pending).await?;
        self.commit(prepared, false).await
    }

    /// Apply debounced batches until the sender goes away
    pub async fn watch(self: Arc<Self>, mut batches: mpsc::Receiver<Vec<WatchEvent>>) {
        while let Some(batch) = batches.recv().await {
            tracing::debug!(events = batch.len(), "applying watch events");
            if let Err(error) = self.apply(batch).await {
                tracing::error!(%error, "failed to update story index");
            }
        }
        tracing::info!("watcher stopped");
    }

    /// Mark affected files stale and take a generation for each
    pub(crate) async fn schedule(&self, events: Vec<WatchEvent>) -> Vec<Pending> {
        let mut changes: IndexMap<String, Change> = IndexMap::new();
        let mut state = self.state.lock().await;

        for event in events {
            let import_path = self.generator.import_path(event.path());
            match event {
                WatchEvent::Changed(_) => {
                    if self.generator.specifier_for(&import_path).is_some()
                        || is_live(&state.files, &import_path)
                    {
                        changes.insert(import_path, Change::Upsert);
                    }
                }
                WatchEvent::Removed(_) => {
                    if is_live(&state.files, &import_path) {
                        changes.insert(import_path, Change::Remove);
                    } else {
                        // A removed directory takes its files with it
                        let prefix = format!("{import_path}/");
                        let nested: Vec<String> = state
                            .files
                            .iter()
                            .filter(|(path, file)| {
                                path.starts_with(&prefix) && file.status != FileStatus::Removed
                            })
                            .map(|(path, _)| path.clone())
                            .collect();
                        for path in nested {
                            changes.insert(path, Change::Remove);
                        }
                    }
                }
            }
        }

        changes
            .into_iter()
            .map(|(import_path, change)| take_generation(&mut state.files, import_path, change))
            .collect()
    }

    /// Read and parse concurrently, off the async runtime
    pub(crate) async fn prepare_all(&self, pending: Vec<Pending>) -> CacheResult<Vec<Prepared>> {
        let tasks = pending.into_iter().map(|pending| {
            let generator = self.generator.clone();
            tokio::task::spawn_blocking(move || prepare(&generator, pending))
        });

        futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|result| result.map_err(CacheError::from))
            .collect()
    }

    /// Apply prepared results still current, then rebuild and publish.
    /// `force` publishes even when nothing changed.
    pub(crate) async fn commit(&self, prepared: Vec<Prepared>, force: bool) -> CacheResult<bool> {
        let mut state = self.state.lock().await;
        let CacheState { store, files } = &mut *state;
        let mut changed = false;

        for Prepared {
            import_path,
            generation,
            outcome,
        } in prepared
        {
            let Some(file_state) = files.get_mut(&import_path) else {
                continue;
            };
            if file_state.generation != generation {
                tracing::debug!(file = %import_path, generation, "dropping superseded parse");
                continue;
            }

            match outcome {
                Outcome::Unchanged => {
                    file_state.status = if store.failure(&import_path).is_some() {
                        FileStatus::Failed
                    } else {
                        FileStatus::Parsed
                    };
                }
                Outcome::Parsed { hash, file } => {
                    let touched = store.upsert(&import_path, file);
                    tracing::debug!(file = %import_path, touched = touched.len(), "re-indexed");
                    file_state.status = FileStatus::Parsed;
                    file_state.hash = Some(hash);
                    changed = true;
                }
                Outcome::Failed { hash, diagnostic } => {
                    tracing::warn!(file = %import_path, "{}", diagnostic);
                    store.record_failure(&import_path, diagnostic);
                    file_state.status = FileStatus::Failed;
                    file_state.hash = hash;
                    changed = true;
                }
                Outcome::Removed => {
                    let touched = store.remove(&import_path);
                    tracing::debug!(file = %import_path, dependents = touched.len(), "removed");
                    file_state.status = FileStatus::Removed;
                    file_state.hash = None;
                    changed = true;
                }
            }
        }

        if !changed && !force {
            return Ok(false);
        }

        let report = store.build()?;
        let version = self.snapshot().version + 1;
        let snapshot = Arc::new(Snapshot {
            index: Arc::new(report.index),
            diagnostics: report.diagnostics,
            degraded: report.degraded,
            version,
            updated_at: Utc::now(),
        });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();

        tracing::info!(
            entries = snapshot.index.len(),
            diagnostics = snapshot.diagnostics.len(),
            degraded = snapshot.degraded,
            version,
            "story index updated"
        );

        if let Some(channel) = &self.channel {
            channel.invalidate_index();
            channel.set_index(&snapshot.index);
        }

        Ok(true)
    }
}

fn is_live(files: &HashMap<String, FileState>, import_path: &str) -> bool {
    files
        .get(import_path)
        .is_some_and(|file| file.status != FileStatus::Removed)
}

fn take_generation(files: &mut HashMap<String, FileState>, import_path: String, change: Change) -> Pending {
    let file = files.entry(import_path.clone()).or_insert(FileState {
        status: FileStatus::Unparsed,
        generation: 0,
        hash: None,
    });
    file.generation += 1;
    if matches!(file.status, FileStatus::Parsed | FileStatus::Failed) {
        file.status = FileStatus::Stale;
    }

    Pending {
        import_path,
        generation: file.generation,
        change,
        previous_hash: file.hash,
    }
}

fn prepare(generator: &StoryIndexGenerator, pending: Pending) -> Prepared {
    let Pending {
        import_path,
        generation,
        change,
        previous_hash,
    } = pending;

    let outcome = if change == Change::Remove || !generator.exists(&import_path) {
        Outcome::Removed
    } else {
        match generator.read_source(&import_path) {
            Err(_) if !generator.exists(&import_path) => Outcome::Removed,
            Err(diagnostic) => Outcome::Failed {
                hash: None,
                diagnostic,
            },
            Ok(source) => {
                let hash = crc32fast::hash(source.as_bytes());
                if previous_hash == Some(hash) {
                    Outcome::Unchanged
                } else {
                    match generator.index_source(&import_path, &source) {
                        Ok(file) => Outcome::Parsed { hash, file },
                        Err(diagnostic) => Outcome::Failed {
                            hash: Some(hash),
                            diagnostic,
                        },
                    }
                }
            }
        }
    };

    Prepared {
        import_path,
        generation,
        outcome,
    }
}
