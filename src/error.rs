use credential_store::CredentialStoreError;
use thiserror::Error;

/// Session-level failures. `Display` is the text shown to the user.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Health probe or transport failure; blocks execution only.
    #[error("{0}")]
    Connection(String),

    /// Compile or runtime failure reported by the runner, verbatim.
    #[error("{0}")]
    Execution(String),

    #[error("Execution already in progress")]
    ExecutionInFlight,

    /// Local precondition failure; never reaches the network.
    #[error("{0}")]
    Validation(String),

    #[error("Please login to continue")]
    AuthRequired,

    /// The store rejected the bearer credential.
    #[error("{0}")]
    AuthRejected(String),

    /// Non-success response on a file operation. Status detail is dropped.
    #[error("{0}")]
    Server(String),

    /// A file operation could not reach the store.
    #[error("{0}")]
    Transport(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Rename already in progress for file {0}")]
    RenameInFlight(String),

    /// The session was torn down; nothing further is applied.
    #[error("Session has been closed")]
    Closed,

    #[error("Credential storage failed: {0}")]
    Credentials(#[from] CredentialStoreError),
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures detected before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::AuthRequired
                | Self::ExecutionInFlight
                | Self::RenameInFlight(_)
                | Self::UnknownLanguage(_)
                | Self::Closed
        )
    }
}
