use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use walkdir::WalkDir;

/// Directory names never descended into when walking a project
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// File system abstraction for discovery, reads and testing
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Canonicalize a path (resolve symlinks, make absolute)
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error>;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;

    /// List every file below `root`, recursively, in no particular order
    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>, std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::canonicalize(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .map(|name| IGNORED_DIRS.contains(&name))
                        .unwrap_or(false)
            });

        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

/// In-memory file system for testing
///
/// Contents can be changed after construction, which lets watcher and cache
/// tests simulate edits without touching the disk.
#[derive(Default)]
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), contents.into());
        }
    }

    pub fn remove_file(&self, path: &Path) {
        if let Ok(mut files) = self.files.write() {
            files.remove(path);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| {
                files.contains_key(path) || files.keys().any(|file| file.starts_with(path))
            })
            .unwrap_or(false)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        // For mock, just return the path as-is
        Ok(path.to_path_buf())
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files
            .read()
            .ok()
            .and_then(|files| files.get(path).cloned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        let files = self
            .files
            .read()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "poisoned lock"))?;

        Ok(files
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect())
    }
}
