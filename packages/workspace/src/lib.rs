//! Live story index: cache, file watching, server channel and HTTP surface

pub mod cache;
pub mod channel;
pub mod config;
pub mod editor;
pub mod server;
pub mod watcher;

#[cfg(test)]
mod tests_cache;

pub use cache::{CacheError, CacheResult, FileState, FileStatus, IndexCache, Snapshot};
pub use channel::{
    ChannelConnection, ChannelError, ChannelEvent, ChannelResult, ServerChannel,
    OPEN_IN_EDITOR_REQUEST, OPEN_IN_EDITOR_RESPONSE, SET_INDEX, STORY_INDEX_INVALIDATED,
};
pub use config::{Config, ConfigError, ConfigResult, ServerConfig, WatchConfig, DEFAULT_CONFIG_NAME};
pub use editor::{register_open_in_editor, CommandLauncher, EditorLauncher};
pub use server::{router, serve, AppState};
pub use watcher::{coalesce, Debouncer, FileWatcher, WatchEvent, WatcherError, WatcherResult};
