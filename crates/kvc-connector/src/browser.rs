//! Browse and introspection.

use std::sync::Arc;

use tracing::{info, warn};

use kvc_metadata::{ObjectDefinition, RegistryCell};
use kvc_store::ExecutionConnection;
use kvc_types::{ObjectTypeId, OperationType, Role};

use crate::error::{ConnectorError, ConnectorResult};

/// Reply a healthy node gives to `PING`.
pub const PING_REPLY: &str = "PONG";

/// A browsable object type as shown to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTypeInfo {
    pub id: ObjectTypeId,
    pub label: String,
    pub help_text: Option<String>,
}

/// Introspection bound to its own execution context.
pub struct Browser {
    registry: Arc<RegistryCell>,
    conn: ExecutionConnection,
}

impl Browser {
    pub(crate) fn new(registry: Arc<RegistryCell>, conn: ExecutionConnection) -> Self {
        Self { registry, conn }
    }

    /// Declared object types in descriptor order.
    pub fn object_types(&self) -> ConnectorResult<Vec<ObjectTypeInfo>> {
        let registry = self.registry.get_or_load()?;
        Ok(registry
            .list_types()
            .iter()
            .map(|t| ObjectTypeInfo {
                id: t.id(),
                label: t.label().to_string(),
                help_text: t.help_text().map(str::to_string),
            })
            .collect())
    }

    /// Definitions for an object type and operation, one per requested role.
    pub fn object_definitions(
        &self,
        object_type_id: &str,
        operation: OperationType,
        custom_type: Option<&str>,
        roles: &[Role],
    ) -> ConnectorResult<Vec<ObjectDefinition>> {
        let registry = self.registry.get_or_load()?;
        Ok(registry.object_definitions(object_type_id, operation, custom_type, roles)?)
    }

    /// Checks that the store answers `PING` with `PONG`.
    pub fn test_connection(&self) -> ConnectorResult<()> {
        let _release = self.conn.scoped();
        let reply = self
            .conn
            .acquire()
            .and_then(|mut conn| conn.ping())
            .map_err(|e| ConnectorError::Connectivity(e.to_string()))?;
        if reply != PING_REPLY {
            warn!(context = %self.conn.id(), reply = %reply, "unexpected PING reply");
            return Err(ConnectorError::Connectivity(format!(
                "unexpected PING reply: {reply}"
            )));
        }
        info!(context = %self.conn.id(), "connection test passed");
        Ok(())
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("context", &self.conn.id())
            .finish()
    }
}
