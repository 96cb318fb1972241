//! Workspace-folder registry.
//!
//! A workspace folder is one project root the surrounding tool is operating
//! on. Connections and task terminals are both scoped to the same identity
//! space: a concrete folder, or the global/default context when no folder is
//! open.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use crate::paths::path_begins_with;

/// Opaque identity of a workspace folder, stable for the registry's lifetime.
pub type WorkspaceId = String;

/// One project root.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFolder {
    pub id: WorkspaceId,
    pub name: String,
    pub root: PathBuf,
}

impl WorkspaceFolder {
    pub fn key(&self) -> WorkspaceKey {
        WorkspaceKey::Folder(self.id.clone())
    }
}

/// Scoping key shared by connections and task terminals: a folder identity,
/// or the global context when no workspace is open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkspaceKey {
    Global,
    Folder(WorkspaceId),
}

impl WorkspaceKey {
    pub fn of(folder: Option<&WorkspaceFolder>) -> Self {
        folder.map(WorkspaceFolder::key).unwrap_or(WorkspaceKey::Global)
    }
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Folder(id) => write!(f, "{id}"),
        }
    }
}

/// Enumerable list of open project roots.
#[derive(Default)]
pub struct WorkspaceRegistry {
    folders: Mutex<Vec<WorkspaceFolder>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root. The folder name defaults to the directory's file name.
    pub fn add(&self, root: impl Into<PathBuf>) -> WorkspaceFolder {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        let folder = WorkspaceFolder {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            root,
        };
        self.folders
            .lock()
            .expect("workspace lock poisoned")
            .push(folder.clone());
        folder
    }

    pub fn remove(&self, id: &str) -> Option<WorkspaceFolder> {
        let mut folders = self.folders.lock().expect("workspace lock poisoned");
        let pos = folders.iter().position(|f| f.id == id)?;
        Some(folders.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<WorkspaceFolder> {
        self.folders
            .lock()
            .expect("workspace lock poisoned")
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    pub fn folders(&self) -> Vec<WorkspaceFolder> {
        self.folders.lock().expect("workspace lock poisoned").clone()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.lock().expect("workspace lock poisoned").is_empty()
    }

    /// Folder whose root equals `root` exactly.
    pub fn folder_for_root(&self, root: &Path) -> Option<WorkspaceFolder> {
        self.folders
            .lock()
            .expect("workspace lock poisoned")
            .iter()
            .find(|f| f.root == root)
            .cloned()
    }

    /// Deepest registered folder containing `path`, if any.
    pub fn folder_for_path(&self, path: &Path) -> Option<WorkspaceFolder> {
        self.folders
            .lock()
            .expect("workspace lock poisoned")
            .iter()
            .filter(|f| path_begins_with(path, &f.root))
            .max_by_key(|f| f.root.components().count())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_path_prefers_deepest_root() {
        let registry = WorkspaceRegistry::new();
        let outer = registry.add("/proj");
        let inner = registry.add("/proj/site");

        let hit = registry
            .folder_for_path(&PathBuf::from("/proj/site/index.html"))
            .expect("containing folder");
        assert_eq!(hit.id, inner.id);

        let hit = registry
            .folder_for_path(&PathBuf::from("/proj/README.md"))
            .expect("containing folder");
        assert_eq!(hit.id, outer.id);

        assert!(registry
            .folder_for_path(&PathBuf::from("/elsewhere/x"))
            .is_none());
    }

    #[test]
    fn remove_forgets_folder() {
        let registry = WorkspaceRegistry::new();
        let folder = registry.add("/proj");
        assert!(registry.get(&folder.id).is_some());
        registry.remove(&folder.id);
        assert!(registry.get(&folder.id).is_none());
        assert!(registry.is_empty());
    }
}
