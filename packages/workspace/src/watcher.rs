use indexmap::IndexMap;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// A file system change relevant to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            WatchEvent::Changed(path) | WatchEvent::Removed(path) => path,
        }
    }

    /// Index-relevant events for a raw notify event
    pub fn from_notify(event: Event) -> Vec<WatchEvent> {
        match event.kind {
            EventKind::Access(_) => Vec::new(),
            EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
            _ => event.paths.into_iter().map(WatchEvent::Changed).collect(),
        }
    }
}

/// Recursive watcher over the stories directories
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    pub fn new(paths: &[PathBuf]) -> WatcherResult<Self> {
        if paths.is_empty() {
            return Err(WatcherError::WatchError("nothing to watch".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(forward(tx), Config::default())?;
        for path in paths {
            watcher.watch(path, RecursiveMode::Recursive)?;
            tracing::debug!(path = %path.display(), "watching");
        }

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<WatchEvent> {
        self.receiver.try_recv().ok()
    }

    /// Coalesce events with `window` and deliver them as batches. The watcher
    /// lives as long as the returned receiver.
    pub fn into_debounced(self, window: Duration) -> mpsc::Receiver<Vec<WatchEvent>> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let FileWatcher {
                _watcher: watcher,
                receiver,
            } = self;
            let mut debouncer = Debouncer::new(receiver, window);
            while let Some(batch) = debouncer.next_batch().await {
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
            drop(watcher);
        });
        rx
    }
}

fn forward(tx: UnboundedSender<WatchEvent>) -> impl Fn(notify::Result<Event>) + Send + 'static {
    move |result| match result {
        Ok(event) => {
            for change in WatchEvent::from_notify(event) {
                let _ = tx.send(change);
            }
        }
        Err(error) => tracing::warn!(%error, "watch error"),
    }
}

/// A batch is flushed after this many windows even if events keep coming
const MAX_WAIT_WINDOWS: u32 = 10;

/// Groups events arriving within `window` of each other
pub struct Debouncer {
    receiver: UnboundedReceiver<WatchEvent>,
    window: Duration,
    max_wait: Duration,
}

impl Debouncer {
    pub fn new(receiver: UnboundedReceiver<WatchEvent>, window: Duration) -> Self {
        Self {
            receiver,
            window,
            max_wait: window * MAX_WAIT_WINDOWS,
        }
    }

    /// Cap on how long one batch keeps collecting
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Wait for an event, then keep collecting until the window passes
    /// quietly or `max_wait` has elapsed since the first event. `None` once
    /// the sender is gone and nothing is pending.
    pub async fn next_batch(&mut self) -> Option<Vec<WatchEvent>> {
        let first = self.receiver.recv().await?;
        let deadline = Instant::now() + self.max_wait;
        let mut pending = vec![first];

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let quiet = (now + self.window).min(deadline);
            match tokio::time::timeout_at(quiet, self.receiver.recv()).await {
                Ok(Some(event)) => pending.push(event),
                Ok(None) | Err(_) => break,
            }
        }

        let batch = coalesce(pending);
        tracing::debug!(events = batch.len(), "debounced watch events");
        Some(batch)
    }
}

/// One event per path, the last one seen, in first-seen order
pub fn coalesce(events: Vec<WatchEvent>) -> Vec<WatchEvent> {
    let mut latest: IndexMap<PathBuf, WatchEvent> = IndexMap::new();
    for event in events {
        latest.insert(event.path().clone(), event);
    }
    latest.into_values().collect()
}
