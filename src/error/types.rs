//! Store error types

use std::fmt;
use thiserror::Error;

/// Which external store an operation addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Blob,
    Secret,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Blob => write!(f, "blob store"),
            StoreKind::Secret => write!(f, "secret store"),
        }
    }
}

/// Failure reported by a store adapter.
///
/// The facade never wraps or retries these; the first failure in a group
/// is returned to the caller as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{store} read failed for {key}: {message}")]
    Read {
        store: StoreKind,
        key: String,
        message: String,
    },

    #[error("{store} write failed for {key}: {message}")]
    Write {
        store: StoreKind,
        key: String,
        message: String,
    },
}

impl StoreError {
    pub fn read(store: StoreKind, key: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Read {
            store,
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn write(store: StoreKind, key: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Write {
            store,
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// The store the failing operation addressed
    pub fn store(&self) -> StoreKind {
        match self {
            StoreError::Read { store, .. } | StoreError::Write { store, .. } => *store,
        }
    }

    /// The fully composed key or secret id of the failing operation
    pub fn key(&self) -> &str {
        match self {
            StoreError::Read { key, .. } | StoreError::Write { key, .. } => key,
        }
    }
}
