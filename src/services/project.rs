//! Project Store
//!
//! The file-set collaborator the orchestrator reads snapshots from, plus
//! the helper that materializes generated files on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use codeplan_core::{canonical_file_key, sanitize_relative_path};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::plan_mode::types::FileMap;
use crate::utils::error::{AppError, AppResult};

/// Default per-file size cap for directory snapshots (256 KiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 256 * 1024;

/// The currently materialized project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: String,
    pub files: FileMap,
}

/// Source of the current project. `None` means no project is materialized.
pub trait ProjectStore: Send + Sync {
    fn load_current_project(&self) -> Option<ProjectSnapshot>;
}

/// Project held in memory; settable and clearable at runtime.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    current: RwLock<Option<ProjectSnapshot>>,
}

impl InMemoryProjectStore {
    /// Store with no project.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store holding `project`.
    pub fn with_project(id: impl Into<String>, files: FileMap) -> Self {
        Self {
            current: RwLock::new(Some(ProjectSnapshot {
                id: id.into(),
                files,
            })),
        }
    }

    pub fn set_current(&self, project: ProjectSnapshot) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(project);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl ProjectStore for InMemoryProjectStore {
    fn load_current_project(&self) -> Option<ProjectSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Project backed by a directory on disk.
///
/// Walks the tree with gitignore rules applied, skipping hidden entries,
/// files over the size cap and anything that is not UTF-8 text.
#[derive(Debug, Clone)]
pub struct DirectoryProjectStore {
    root: PathBuf,
    id: String,
    max_file_bytes: u64,
}

impl DirectoryProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        Self {
            root,
            id,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(&self) -> FileMap {
        let mut files = FileMap::new();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .follow_links(false)
            .require_git(false)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(false);

        for entry in builder.build() {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            match fs::metadata(path) {
                Ok(meta) if meta.len() <= self.max_file_bytes => {}
                _ => continue,
            }
            // Binary and non-UTF-8 files are skipped
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            let Some(key) = rel.to_str().and_then(|r| canonical_file_key(r).ok()) else {
                continue;
            };
            files.insert(key, content);
        }

        files
    }
}

impl ProjectStore for DirectoryProjectStore {
    fn load_current_project(&self) -> Option<ProjectSnapshot> {
        if !self.root.is_dir() {
            warn!(root = %self.root.display(), "project: root is not a directory");
            return None;
        }
        let files = self.scan();
        debug!(id = %self.id, files = files.len(), "project: directory scanned");
        Some(ProjectSnapshot {
            id: self.id.clone(),
            files,
        })
    }
}

/// Re-key `files` by [`canonical_file_key`]. Names that would escape the
/// project root are dropped.
pub fn canonical_file_map(files: FileMap) -> FileMap {
    let mut out = FileMap::new();
    for (name, code) in files {
        match canonical_file_key(&name) {
            Ok(key) => {
                out.insert(key, code);
            }
            Err(err) => warn!(name = %name, error = %err, "project: dropping file"),
        }
    }
    out
}

/// Write `files` under `root`, creating parent directories as needed.
///
/// Every path is validated before anything is written, so a single
/// escaping path leaves the directory untouched. Returns the relative
/// paths written, in map order.
pub fn write_files(root: &Path, files: &FileMap) -> AppResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AppError::not_found(format!(
            "project directory {}",
            root.display()
        )));
    }

    let targets = files
        .iter()
        .map(|(name, code)| Ok((sanitize_relative_path(name)?, code)))
        .collect::<AppResult<Vec<_>>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (rel, code) in targets {
        let full = root.join(&rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, code)?;
        written.push(rel);
    }

    debug!(count = written.len(), root = %root.display(), "project: files written");
    Ok(written)
}
