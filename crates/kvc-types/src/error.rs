use thiserror::Error;

/// Errors produced by type parsing and configuration loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("object type {0} is not supported")]
    UnsupportedObjectType(String),

    #[error("unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("missing required property: {0}")]
    MissingProperty(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for type operations.
pub type TypesResult<T> = Result<T, TypesError>;
