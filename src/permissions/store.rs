use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use super::{error::PermissionsError, table::PermissionTable};

/// PermissionStore
///
/// Publishes the permission table that request handlers read. Readers take an
/// `Arc` snapshot and never hold the lock while querying; `replace` swaps in a
/// whole new table, so nobody can observe a partially updated one.
#[derive(Debug)]
pub struct PermissionStore {
    current: RwLock<Arc<PermissionTable>>,
}

impl PermissionStore {
    pub fn new(table: PermissionTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// Starts from the built-in table.
    pub fn builtin() -> Self {
        Self::new(super::default_table().clone())
    }

    /// Starts from a JSON table on disk. The file must cover every canonical role.
    pub fn from_file(path: &Path) -> Result<Self, PermissionsError> {
        load_table(path).map(Self::new)
    }

    pub fn snapshot(&self) -> Arc<PermissionTable> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes `table` and returns the one it replaced.
    pub fn replace(&self, table: PermissionTable) -> Arc<PermissionTable> {
        let next = Arc::new(table);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self::builtin()
    }
}

/// PermissionState
///
/// The concrete type used to share the permission store across the application state.
pub type PermissionState = Arc<PermissionStore>;

pub fn load_table(path: &Path) -> Result<PermissionTable, PermissionsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PermissionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), "loaded permission table from file");
    Ok(table)
}
