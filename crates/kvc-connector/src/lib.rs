//! Key-value connector for String and HashSet object types.
//!
//! A [`Connector`] is built once from connector properties. It hands out a
//! [`Browser`] for introspection and connection tests, and routes an object
//! type id and verb to an [`Operation`] that runs batches.
//!
//! # Outcome Contract
//!
//! Every batch reports exactly one [`OperationResult`](kvc_types::OperationResult)
//! per input item, including items that fail. Store errors never escape a
//! batch; they become `ERR` outcomes for the items they affect. The only
//! errors returned to the caller are configuration errors raised before any
//! store command is issued.

pub mod browser;
pub mod codec;
pub mod connector;
pub mod error;
pub mod handler;
pub mod router;

pub use browser::{Browser, ObjectTypeInfo, PING_REPLY};
pub use codec::DocumentError;
pub use connector::Connector;
pub use error::{ConnectorError, ConnectorResult};
pub use handler::{HandlerSettings, MISSING_KEY};
pub use router::{Operation, OperationKind};
