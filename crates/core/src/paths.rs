//! Project-relative path handling.
//!
//! Model output names files the way a browser sandbox does (`/App.js`,
//! `src/Login.js`). Before touching disk those names are reduced to a
//! relative path that cannot escape the project root.

use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Turn a model-supplied file name into a safe path relative to the project root.
///
/// Leading `/` (sandbox root) is dropped. Empty paths, `..` components and
/// drive prefixes are rejected.
pub fn sanitize_relative_path(raw: &str) -> CoreResult<PathBuf> {
    let trimmed = raw.trim().trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("invalid file path: {raw:?}")));
    }

    let mut out = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::validation(format!(
                    "file path escapes project root: {raw}"
                )));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(CoreError::validation(format!("invalid file path: {raw:?}")));
    }
    Ok(out)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical key for a file name: the sanitized relative path with `/`
/// separators, so `/src/App.js`, `./src/App.js` and `src/App.js` agree.
pub fn canonical_file_key(raw: &str) -> CoreResult<String> {
    Ok(to_slash_path(&sanitize_relative_path(raw)?))
}
