use std::path::PathBuf;
use thiserror::Error;

use super::roles::Role;

/// Failures building or loading a permission table. The queries themselves never fail.
#[derive(Debug, Error)]
pub enum PermissionsError {
    #[error("permission table has no entry for role {0}")]
    MissingRole(Role),
    #[error("failed to read permission file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid permission file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string that names no canonical role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

/// A string that names no action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action `{0}`")]
pub struct UnknownAction(pub String);
