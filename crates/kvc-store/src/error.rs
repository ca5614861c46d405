use thiserror::Error;

/// Errors from store access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Malformed node list or node address.
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// A node could not be reached or the link failed mid-command.
    #[error("store connectivity error: {0}")]
    Connectivity(String),

    /// The store answered a command with an error reply.
    #[error("{command} failed: {reason}")]
    Command { command: String, reason: String },

    /// The shared client has already been torn down.
    #[error("store client has been disposed")]
    Disposed,
}

impl StoreError {
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
