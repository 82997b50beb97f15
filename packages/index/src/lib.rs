//! Story index builder
//!
//! Discovers story and docs files from the configured `stories` entries,
//! parses each one without evaluating it, claims entry ids across files and
//! orders the result for the sidebar.

pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod generator;
pub mod graph;
pub mod indexer;
pub mod options;
pub mod specifier;
pub mod store;
pub mod title;

#[cfg(test)]
mod tests_store;

pub use diagnostics::IndexDiagnostic;
pub use entry::{EntrySubtype, EntryType, IndexEntry, StoryIndex, INDEX_VERSION};
pub use error::{IndexError, IndexResult};
pub use generator::StoryIndexGenerator;
pub use graph::DependencyGraph;
pub use indexer::{
    default_indexers, CsfIndexer, DocsIndexer, DocsRecord, IndexedFile, Indexer, IndexerContext,
    StoriesRecord, StoryRecord, TestRecord,
};
pub use options::{Autodocs, DocsOptions, IndexOptions, DEFAULT_TAGS};
pub use specifier::{NormalizedSpecifier, StoriesEntry, DEFAULT_FILES_PATTERN};
pub use store::{BuildReport, IndexStore};
pub use title::auto_title;
