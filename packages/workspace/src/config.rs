use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use storyloom_common::FileSystem;
use storyloom_index::{DocsOptions, IndexError, IndexOptions, StoriesEntry, StoryIndexGenerator};
use storyloom_sort::StorySortOptions;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "storyloom.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stories directory could be resolved from the configuration")]
    NoStories,

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Project configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Where story and docs files live
    pub stories: Vec<StoriesEntry>,
    pub story_sort: StorySortOptions,
    /// Tags applied to every entry
    pub tags: Vec<String>,
    pub docs: DocsOptions,
    pub watch: WatchConfig,
    pub server: ServerConfig,
    /// Command used to open files from the preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6006,
        }
    }
}

impl Config {
    /// Load `storyloom.config.json` from `root`; a missing file yields defaults
    pub fn load(root: &Path) -> ConfigResult<Self> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            docs: self.docs.clone(),
            tags: self.tags.clone(),
            story_sort: self.story_sort.clone(),
        }
    }

    /// Build the index generator. Fails when nothing can be indexed, which
    /// stops startup.
    pub fn generator(&self, root: &Path, fs: Arc<dyn FileSystem>) -> ConfigResult<StoryIndexGenerator> {
        if self.stories.is_empty() {
            return Err(ConfigError::NoStories);
        }
        self.story_sort.validate().map_err(IndexError::from)?;

        let generator = StoryIndexGenerator::new(root, &self.stories, self.index_options(), fs)?;
        if generator.resolvable_directories().is_empty() {
            return Err(ConfigError::NoStories);
        }
        Ok(generator)
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.watch.debounce_ms)
    }
}
