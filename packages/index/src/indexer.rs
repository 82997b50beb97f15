//! Per-file indexers
//!
//! An indexer turns one source file into an `IndexedFile`. The store keeps
//! these records and assembles entries from them, so a file is parsed only
//! when its own content changes.

use storyloom_csf::{CsfFile, CsfResult, DocsFile, MakeTitle};

/// What an indexer needs besides the source text
pub struct IndexerContext<'a> {
    pub import_path: &'a str,
    /// Resolves the final title from the title written in the file
    pub make_title: MakeTitle<'a>,
}

pub trait Indexer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this indexer handles the file at `import_path`
    fn test(&self, import_path: &str) -> bool;

    fn index(&self, source: &str, context: &IndexerContext<'_>) -> CsfResult<IndexedFile>;
}

/// Parsed form of one file, before ids are claimed or tags combined
#[derive(Debug, Clone, PartialEq)]
pub enum IndexedFile {
    Stories(StoriesRecord),
    Docs(DocsRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoriesRecord {
    pub title: String,
    /// `id` written on the meta, used instead of the title for docs ids
    pub meta_id: Option<String>,
    pub meta_tags: Vec<String>,
    pub stories: Vec<StoryRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryRecord {
    pub id: String,
    pub export_name: String,
    pub name: String,
    pub tags: Vec<String>,
    pub tests: Vec<TestRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocsRecord {
    /// Title from `<Meta title>` or the file location; attached pages use
    /// the title of the file named by `of`
    pub title: Option<String>,
    pub name: Option<String>,
    /// Import source of `<Meta of={...} />`
    pub of: Option<String>,
    pub imports: Vec<String>,
    pub is_template: bool,
}

/// Component story files: `*.stories.{js,jsx,mjs,ts,tsx}`
#[derive(Debug, Default, Clone, Copy)]
pub struct CsfIndexer;

const STORY_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

impl Indexer for CsfIndexer {
    fn name(&self) -> &'static str {
        "csf"
    }

    fn test(&self, import_path: &str) -> bool {
        let file_name = import_path.rsplit('/').next().unwrap_or(import_path);
        let mut parts = file_name.rsplitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(extension), Some(kind), Some(stem)) => {
                !stem.is_empty()
                    && (kind == "stories" || kind == "story")
                    && STORY_EXTENSIONS.contains(&extension)
            }
            _ => false,
        }
    }

    fn index(&self, source: &str, context: &IndexerContext<'_>) -> CsfResult<IndexedFile> {
        let csf = CsfFile::parse(source, context.import_path, context.make_title)?;

        let stories = csf
            .stories
            .into_iter()
            .map(|story| StoryRecord {
                id: story.id,
                export_name: story.export_name,
                name: story.name,
                tags: story.tags,
                tests: story
                    .tests
                    .into_iter()
                    .map(|test| TestRecord {
                        id: test.id,
                        name: test.name,
                        tags: test.tags,
                    })
                    .collect(),
            })
            .collect();

        Ok(IndexedFile::Stories(StoriesRecord {
            title: csf.title,
            meta_id: csf.meta.id,
            meta_tags: csf.meta.tags,
            stories,
        }))
    }
}

/// MDX docs pages
#[derive(Debug, Default, Clone, Copy)]
pub struct DocsIndexer;

impl Indexer for DocsIndexer {
    fn name(&self) -> &'static str {
        "mdx"
    }

    fn test(&self, import_path: &str) -> bool {
        import_path.ends_with(".mdx")
    }

    fn index(&self, source: &str, context: &IndexerContext<'_>) -> CsfResult<IndexedFile> {
        let docs = DocsFile::parse(source, context.import_path)?;

        Ok(IndexedFile::Docs(DocsRecord {
            title: (context.make_title)(docs.title.as_deref()),
            name: docs.name,
            of: docs.of,
            imports: docs.imports,
            is_template: docs.is_template,
        }))
    }
}

/// The built-in indexers, tried in order
pub fn default_indexers() -> Vec<Box<dyn Indexer>> {
    vec![Box::new(CsfIndexer), Box::new(DocsIndexer)]
}
