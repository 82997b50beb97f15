use std::path::{Component, Path, PathBuf};

/// Convert an absolute path into the `./`-prefixed, `/`-separated form used
/// for `importPath` values, relative to the project root.
pub fn to_import_path(root: &Path, path: &Path) -> String {
    let relative = relative_to(root, path);
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Path of `path` relative to `root`, walking up with `..` when `path` lies
/// outside of `root`.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    let root = normalize_path(root);
    let path = normalize_path(path);
    if let Ok(stripped) = path.strip_prefix(&root) {
        return stripped.to_path_buf();
    }

    let root_parts: Vec<_> = root.components().collect();
    let path_parts: Vec<_> = path.components().collect();
    let shared = root_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in shared..root_parts.len() {
        out.push("..");
    }
    for part in &path_parts[shared..] {
        out.push(part.as_os_str());
    }
    out
}

/// Lexically normalize a path: drop `.` segments and fold `..` into its parent.
/// Does not touch the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
