//! Titles derived from file locations

use crate::specifier::NormalizedSpecifier;

/// Title for `import_path` under `specifier`
///
/// A title written in the file wins but still receives the specifier's
/// prefix. Otherwise the path below the specifier directory is used, with
/// extensions stripped from the first `.` and a trailing `index` (or a file
/// named after its folder) dropped. Returns `None` when the file lies outside
/// the specifier directory and has no title of its own.
pub fn auto_title(
    import_path: &str,
    specifier: &NormalizedSpecifier,
    user_title: Option<&str>,
) -> Option<String> {
    if let Some(title) = user_title {
        return Some(join_title(&specifier.title_prefix, title));
    }

    let relative = specifier.relative(import_path)?;
    let mut segments: Vec<String> = relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    let last = segments.pop()?;
    let stem = match last.find('.') {
        Some(dot) if dot > 0 => &last[..dot],
        _ => last.as_str(),
    };
    let redundant = stem.eq_ignore_ascii_case("index")
        || segments.last().map(String::as_str) == Some(stem);
    if !redundant {
        segments.push(stem.to_string());
    }

    let title = join_title(&specifier.title_prefix, &segments.join("/"));
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn join_title(prefix: &str, title: &str) -> String {
    prefix
        .split('/')
        .chain(title.split('/'))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
