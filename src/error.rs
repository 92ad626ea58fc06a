//! Error type shared by the stores and settings loader.

/// Errors the stores report back to callers.
///
/// Most failure conditions are carried as data (the `error` fields on the
/// store states); these are the cases where a caller asked for something the
/// store cannot do.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("scan not found: {0}")]
    ScanNotFound(String),
    #[error("invalid connection mode: {0}")]
    InvalidMode(String),
    #[error("invalid setting {key}: {message}")]
    Config { key: String, message: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
