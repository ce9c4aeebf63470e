//! Path normalization helpers
//!
//! The directive catalogs are keyed by paths normalized relative to the root
//! file with forward-slash separators. Two spellings of the same logical path
//! must collide on the same key, so every catalog write goes through
//! [`catalog_key`]. All of this is lexical: no filesystem access, no symlink
//! resolution.

use std::path::{Component, Path, PathBuf};

/// Make a path absolute against the current working directory, then fold
/// `.`/`..` components away.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    lexical_normalize(&joined)
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the start of a relative path is kept; `..` directly under the
/// root is dropped (there is nothing above the root).
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Express `path` relative to `base`, lexically.
///
/// Both paths are normalized first. When they share no common prefix (e.g.
/// different drive prefixes), `path` is returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = lexical_normalize(path);
    let base = lexical_normalize(base);

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let mut shared = 0;
    while shared < path_parts.len()
        && shared < base_parts.len()
        && path_parts[shared] == base_parts[shared]
    {
        shared += 1;
    }

    // No common component at all means different roots (e.g. drive
    // prefixes); there is no meaningful relative spelling.
    if shared == 0 && path.is_absolute() {
        return path;
    }

    let mut out = PathBuf::new();
    for _ in shared..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[shared..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a path with forward-slash separators regardless of platform.
pub fn forward_slashes(path: &Path) -> String {
    let rendered = path.display().to_string();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// The canonical catalog key for a directive target: `target` expressed
/// relative to the root file's directory, forward slashes.
pub fn catalog_key(target: &Path, root_dir: &Path) -> String {
    forward_slashes(&relative_to(target, root_dir))
}
