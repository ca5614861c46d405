//! Foundation types for the key-value connector (KVC).
//!
//! This crate provides the vocabulary shared by every other KVC crate: the
//! logical object types exposed to the host platform, the batch items the
//! host hands to an operation, the per-item outcomes reported back, and the
//! connector configuration.
//!
//! # Key Types
//!
//! - [`ObjectTypeId`] -- The two supported logical shapes (`String`, `HashSet`)
//! - [`OperationType`] / [`Verb`] / [`Role`] -- Operation vocabulary for routing and metadata
//! - [`ObjectIdItem`] / [`ObjectDataItem`] -- One input item of a batch
//! - [`Request`] -- A batch tagged with its verb
//! - [`OperationResult`] / [`ResponseSink`] -- Per-item outcome reporting
//! - [`KeyFormatter`] -- Applies the configured key prefix
//! - [`ConnectorProperties`] / [`ConnectorConfig`] -- Configuration

pub mod config;
pub mod error;
pub mod item;
pub mod key;
pub mod object;
pub mod request;
pub mod response;

pub use config::{ConnectorConfig, ConnectorProperties, PropertySource};
pub use error::{TypesError, TypesResult};
pub use item::{
    parse_ttl, DynamicProperties, ItemId, ObjectDataItem, ObjectIdItem, NO_EXPIRY, PROP_FIELD,
    PROP_KEY, PROP_TTL,
};
pub use key::KeyFormatter;
pub use object::{ObjectTypeId, OperationType, Role, Verb};
pub use request::Request;
pub use response::{
    CollectingResponse, OperationResult, OperationStatus, Payload, ResponseSink, ResultCode,
    TTL_METADATA,
};
