//! Error types for quick-next-core operations.
//!
//! Nothing in the watcher or the control surfaces these to a caller: they are
//! logged and the component degrades. They exist so the storage, host and CLI
//! seams can say precisely what went wrong.

use std::path::PathBuf;

/// Failure reported by a [`HostPage`](crate::host::HostPage) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("document not ready")]
    NotReady,

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("script error: {0}")]
    Script(String),
}

/// All errors that can occur in quick-next-core operations.
#[derive(Debug, thiserror::Error)]
pub enum QuickNextError {
    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage is not available in this context")]
    StorageUnavailable,

    #[error("Storage I/O error: {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    // ─────────────────────────────────────────────────────────────────────
    // Page Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No usable next-page control on the host page")]
    LookupMiss,

    #[error("Activating {selector} failed: {source}")]
    Activation {
        selector: String,
        #[source]
        source: HostError,
    },

    #[error("Host page error: {0}")]
    Host(#[from] HostError),

    // ─────────────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("An instance is already registered for context {0}")]
    AlreadyRegistered(String),
}

/// Convenience type alias for Results using QuickNextError.
pub type Result<T> = std::result::Result<T, QuickNextError>;

impl From<QuickNextError> for String {
    fn from(err: QuickNextError) -> String {
        err.to_string()
    }
}
