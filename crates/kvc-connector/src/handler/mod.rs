//! CRUD execution handlers.
//!
//! Every handler reports exactly one outcome per input item through the
//! sink and never returns an error: store failures become `ERR` outcomes
//! for the items they affect.

pub mod delete;
pub mod get;
pub mod upsert;

use tracing::warn;

use kvc_store::{ExecutionConnection, TTL_MISSING, TTL_NO_EXPIRY};
use kvc_types::{
    ItemId, KeyFormatter, OperationResult, Payload, ResponseSink, ResultCode, TTL_METADATA,
};

/// Reported when an item carries no usable key.
pub const MISSING_KEY: &str = "Key is a required document property";

/// Settings shared by every handler of one connector.
#[derive(Clone, Debug, Default)]
pub struct HandlerSettings {
    pub keys: KeyFormatter,
    pub throw_on_not_found: bool,
}

/// What a handler needs to run one batch.
pub struct Context<'a> {
    pub conn: &'a ExecutionConnection,
    pub settings: &'a HandlerSettings,
}

impl<'a> Context<'a> {
    pub fn new(conn: &'a ExecutionConnection, settings: &'a HandlerSettings) -> Self {
        Self { conn, settings }
    }

    /// Formats a logical key, `None` when it is missing or empty.
    pub fn key(&self, logical: Option<&str>) -> Option<String> {
        self.settings.keys.format(logical)
    }

    pub fn missing_key(&self, item: ItemId, sink: &mut dyn ResponseSink) {
        sink.add_result(OperationResult::application_error(
            item,
            ResultCode::NoKey,
            MISSING_KEY,
            None,
        ));
    }

    /// Reports an absent value as an empty success, or as `NOT_FOUND` when
    /// the connector is configured to throw.
    pub fn not_found(&self, item: ItemId, message: String, sink: &mut dyn ResponseSink) {
        if self.settings.throw_on_not_found {
            sink.add_result(OperationResult::application_error(
                item,
                ResultCode::NotFound,
                message,
                None,
            ));
        } else {
            sink.add_result(OperationResult::empty_success(item));
        }
    }

    pub fn failure(&self, item: ItemId, err: &dyn std::fmt::Display, sink: &mut dyn ResponseSink) {
        warn!(context = %self.conn.id(), item = %item, error = %err, "item failed");
        sink.add_result(OperationResult::failure(item, err.to_string()));
    }
}

/// Attaches remaining TTL metadata to a get payload.
///
/// No expiry is omitted; an already expired key reports `0`.
pub fn with_ttl(payload: Payload, ttl: i64) -> Payload {
    match ttl {
        TTL_NO_EXPIRY => payload,
        TTL_MISSING => payload.with_metadata(TTL_METADATA, "0"),
        remaining => payload.with_metadata(TTL_METADATA, remaining.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use kvc_metadata::EmbeddedResources;
    use kvc_store::{InMemoryClientFactory, InMemoryStore};
    use kvc_types::{ConnectorProperties, ObjectDataItem, ObjectIdItem, PROP_FIELD, PROP_KEY, PROP_TTL};

    use crate::connector::Connector;

    pub const HOSTS: &str = "redis://primary:6379;redis://replica:6379";

    pub fn connector_with(properties: ConnectorProperties) -> (Connector, Arc<InMemoryStore>) {
        let store = InMemoryStore::shared();
        let connector = Connector::new(
            properties,
            InMemoryClientFactory::new(Arc::clone(&store)),
            EmbeddedResources,
        )
        .unwrap();
        (connector, store)
    }

    pub fn connector() -> (Connector, Arc<InMemoryStore>) {
        connector_with(ConnectorProperties::new(HOSTS))
    }

    pub fn id_item(n: u64, key: &str) -> ObjectIdItem {
        ObjectIdItem::new(kvc_types::ItemId(n), key)
    }

    pub fn field_item(n: u64, key: &str, field: &str) -> ObjectIdItem {
        id_item(n, key).with_property(PROP_FIELD, field)
    }

    pub fn data_item(n: u64, key: &str, data: &str) -> ObjectDataItem {
        ObjectDataItem::new(kvc_types::ItemId(n), data.to_string()).with_property(PROP_KEY, key)
    }

    pub fn data_item_ttl(n: u64, key: &str, data: &str, ttl: &str) -> ObjectDataItem {
        data_item(n, key, data).with_property(PROP_TTL, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_metadata_normalization() {
        assert_eq!(with_ttl(Payload::new("v"), TTL_NO_EXPIRY).ttl(), None);
        assert_eq!(with_ttl(Payload::new("v"), TTL_MISSING).ttl(), Some("0"));
        assert_eq!(with_ttl(Payload::new("v"), 0).ttl(), Some("0"));
        assert_eq!(with_ttl(Payload::new("v"), 42).ttl(), Some("42"));
    }
}
