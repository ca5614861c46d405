use thiserror::Error;

/// Errors from metadata loading and lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The top-level descriptor is missing or malformed.
    #[error("invalid object type descriptor: {0}")]
    Descriptor(String),

    /// A schema resource exists but is not valid JSON.
    #[error("invalid schema resource {name}: {reason}")]
    Schema { name: String, reason: String },

    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    /// No definition for the requested operation and role.
    #[error("could not find an object definition id:{id} type:{operation} mode:{role}")]
    DefinitionNotFound {
        id: String,
        operation: String,
        role: String,
    },

    #[error("I/O error reading {name}: {reason}")]
    Io { name: String, reason: String },
}

/// Result alias for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
