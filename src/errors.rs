use thiserror::Error;

/// All errors that can occur in Keydash.
#[derive(Debug, Error)]
pub enum KeydashError {
    // --- Controller errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No signed-in user — pass --user or set KEYDASH_USER_ID")]
    NoSession,

    #[error("API key '{0}' not found")]
    KeyNotFound(String),

    // --- Collaborator errors ---
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    /// A store-backed operation failed; the text is user-facing as is.
    #[error("{0}")]
    Operation(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Failures reported by a record store.
///
/// The controller treats every variant the same way; the split only
/// exists so backends can report something readable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for Keydash results.
pub type Result<T> = std::result::Result<T, KeydashError>;
