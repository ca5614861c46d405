use thiserror::Error;

use kvc_metadata::MetadataError;
use kvc_store::StoreError;
use kvc_types::TypesError;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No handler exists for the object type and verb.
    #[error("{operation} is not implemented for object type {object_type}")]
    NotImplemented {
        operation: String,
        object_type: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("property error: {0}")]
    Types(#[from] TypesError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
