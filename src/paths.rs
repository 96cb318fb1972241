//! Path containment and normalization helpers.

use std::path::{Component, Path};

/// `true` iff `path` is `prefix` itself or a descendant of it, compared
/// component-wise. A naive string prefix would claim `/a/bc` lives under
/// `/a/b`; this does not.
pub fn path_begins_with(path: &Path, prefix: &Path) -> bool {
    let mut path_components = path.components();
    for prefix_component in prefix.components() {
        // Trailing separators yield a final CurDir on some inputs; skip them.
        if prefix_component == Component::CurDir {
            continue;
        }
        match path_components.next() {
            Some(component) if component == prefix_component => {}
            _ => return false,
        }
    }
    true
}

/// The part of `path` below `prefix`, as a forward-slash path with a leading
/// `/`. `None` when `path` is not contained in `prefix`.
pub fn path_relative_to(path: &Path, prefix: &Path) -> Option<String> {
    if !path_begins_with(path, prefix) {
        return None;
    }
    let skip = prefix
        .components()
        .filter(|c| *c != Component::CurDir)
        .count();
    let rest: Vec<String> = path
        .components()
        .skip(skip)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", rest.join("/")))
}

/// Normalize separators to forward slashes.
pub fn to_unix_path(path: &str) -> String {
    path.replace('\\', "/")
}
