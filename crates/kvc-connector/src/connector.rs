//! The connector instance.

use std::sync::Arc;

use tracing::info;

use kvc_metadata::{EmbeddedResources, RegistryCell, ResourceSource};
use kvc_store::{ClientFactory, ConnectionManager, RedisClientFactory, Topology};
use kvc_types::{ConnectorProperties, PropertySource, Verb};

use crate::browser::Browser;
use crate::error::ConnectorResult;
use crate::handler::HandlerSettings;
use crate::router::{Operation, OperationKind};

/// One configured connector.
///
/// Owns the shared store client and the metadata registry. Each browser or
/// operation it hands out gets its own execution context.
pub struct Connector {
    properties: ConnectorProperties,
    settings: HandlerSettings,
    manager: Arc<ConnectionManager>,
    registry: Arc<RegistryCell>,
}

impl Connector {
    /// Builds a connector. A malformed `hosts` list fails here.
    pub fn new(
        properties: ConnectorProperties,
        factory: impl ClientFactory + 'static,
        resources: impl ResourceSource + 'static,
    ) -> ConnectorResult<Self> {
        let topology = Topology::parse(&properties.hosts)?;
        info!(
            topology = %topology,
            key_prefix = %properties.key_prefix,
            throw_on_not_found = properties.throw_on_not_found,
            "connector configured"
        );
        let settings = HandlerSettings {
            keys: properties.key_formatter(),
            throw_on_not_found: properties.throw_on_not_found,
        };
        Ok(Self {
            properties,
            settings,
            manager: Arc::new(ConnectionManager::new(Box::new(factory), topology)),
            registry: Arc::new(RegistryCell::new(resources)),
        })
    }

    /// Builds a connector from the host's property lookup.
    pub fn from_source(
        source: &dyn PropertySource,
        factory: impl ClientFactory + 'static,
        resources: impl ResourceSource + 'static,
    ) -> ConnectorResult<Self> {
        Self::new(ConnectorProperties::from_source(source)?, factory, resources)
    }

    /// A Redis-backed connector with the built-in metadata.
    pub fn redis(properties: ConnectorProperties) -> ConnectorResult<Self> {
        Self::new(properties, RedisClientFactory, EmbeddedResources)
    }

    pub fn properties(&self) -> &ConnectorProperties {
        &self.properties
    }

    pub fn topology(&self) -> &Topology {
        self.manager.topology()
    }

    pub fn browser(&self) -> Browser {
        Browser::new(Arc::clone(&self.registry), self.manager.context())
    }

    /// Routes an object type and verb to an operation.
    pub fn operation(&self, object_type_id: &str, verb: Verb) -> ConnectorResult<Operation> {
        let kind = OperationKind::route(object_type_id, verb)?;
        Ok(Operation::new(kind, self.settings.clone(), self.manager.context()))
    }

    /// Shuts the shared client down. Later calls do nothing.
    pub fn dispose(&self) {
        self.manager.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.manager.is_disposed()
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.manager.dispose();
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("topology", &self.manager.topology().to_string())
            .field("key_prefix", &self.properties.key_prefix)
            .field("disposed", &self.manager.is_disposed())
            .finish()
    }
}
