//! Operation routing.
//!
//! One [`OperationKind`] exists per object type and verb. Routing happens
//! when an operation is constructed, before any store command is issued.

use std::fmt;

use tracing::{debug, info_span};
use uuid::Uuid;

use kvc_store::ExecutionConnection;
use kvc_types::{ObjectTypeId, Request, ResponseSink, Verb};

use crate::error::{ConnectorError, ConnectorResult};
use crate::handler::{self, Context, HandlerSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetString,
    GetHashSet,
    UpsertString,
    UpsertHashSet,
    DeleteString,
    DeleteHashSet,
}

impl OperationKind {
    /// Selects the handler for an object type id and verb.
    pub fn route(object_type_id: &str, verb: Verb) -> ConnectorResult<Self> {
        let object_type: ObjectTypeId =
            object_type_id
                .parse()
                .map_err(|_| ConnectorError::NotImplemented {
                    operation: verb.to_string(),
                    object_type: object_type_id.to_string(),
                })?;
        Ok(match (object_type, verb) {
            (ObjectTypeId::String, Verb::Get) => Self::GetString,
            (ObjectTypeId::HashSet, Verb::Get) => Self::GetHashSet,
            (ObjectTypeId::String, Verb::Upsert) => Self::UpsertString,
            (ObjectTypeId::HashSet, Verb::Upsert) => Self::UpsertHashSet,
            (ObjectTypeId::String, Verb::Delete) => Self::DeleteString,
            (ObjectTypeId::HashSet, Verb::Delete) => Self::DeleteHashSet,
        })
    }

    pub fn object_type(&self) -> ObjectTypeId {
        match self {
            Self::GetString | Self::UpsertString | Self::DeleteString => ObjectTypeId::String,
            Self::GetHashSet | Self::UpsertHashSet | Self::DeleteHashSet => ObjectTypeId::HashSet,
        }
    }

    pub fn verb(&self) -> Verb {
        match self {
            Self::GetString | Self::GetHashSet => Verb::Get,
            Self::UpsertString | Self::UpsertHashSet => Verb::Upsert,
            Self::DeleteString | Self::DeleteHashSet => Verb::Delete,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.object_type())
    }
}

/// A routed operation bound to its own execution context.
pub struct Operation {
    kind: OperationKind,
    settings: HandlerSettings,
    conn: ExecutionConnection,
}

impl Operation {
    pub(crate) fn new(kind: OperationKind, settings: HandlerSettings, conn: ExecutionConnection) -> Self {
        Self {
            kind,
            settings,
            conn,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Identifier of this operation's execution context.
    pub fn context_id(&self) -> Uuid {
        self.conn.id()
    }

    /// Runs one batch, reporting one outcome per item to `sink`.
    ///
    /// Fails only when the request's verb does not match the routed verb.
    /// The connection is released before returning on every path.
    pub fn execute(&self, request: Request, sink: &mut dyn ResponseSink) -> ConnectorResult<()> {
        let span = info_span!(
            "operation",
            context = %self.conn.id(),
            kind = %self.kind,
            items = request.len()
        );
        let _entered = span.enter();
        let _release = self.conn.scoped();
        let ctx = Context::new(&self.conn, &self.settings);

        match (self.kind, request) {
            (OperationKind::GetString, Request::Get(items)) => handler::get::string(&ctx, &items, sink),
            (OperationKind::GetHashSet, Request::Get(items)) => handler::get::hashset(&ctx, &items, sink),
            (OperationKind::UpsertString, Request::Upsert(items)) => {
                handler::upsert::string(&ctx, &items, sink)
            }
            (OperationKind::UpsertHashSet, Request::Upsert(items)) => {
                handler::upsert::hashset(&ctx, &items, sink)
            }
            (OperationKind::DeleteString, Request::Delete(items)) => {
                handler::delete::keys(&ctx, &items, sink)
            }
            (OperationKind::DeleteHashSet, Request::Delete(items)) => {
                handler::delete::hashset(&ctx, &items, sink)
            }
            (kind, request) => {
                return Err(ConnectorError::Config(format!(
                    "{} request cannot run as a {kind} operation",
                    request.verb()
                )))
            }
        }
        debug!("batch complete");
        Ok(())
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("context", &self.conn.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use kvc_types::{CollectingResponse, ItemId, ObjectIdItem};

    use super::*;
    use crate::handler::testing::connector;

    // --- Routing ---

    #[test]
    fn routes_every_combination() {
        let cases = [
            ("String", Verb::Get, OperationKind::GetString),
            ("HashSet", Verb::Get, OperationKind::GetHashSet),
            ("String", Verb::Upsert, OperationKind::UpsertString),
            ("HashSet", Verb::Upsert, OperationKind::UpsertHashSet),
            ("String", Verb::Delete, OperationKind::DeleteString),
            ("HashSet", Verb::Delete, OperationKind::DeleteHashSet),
        ];
        for (id, verb, expected) in cases {
            let kind = OperationKind::route(id, verb).unwrap();
            assert_eq!(kind, expected);
            assert_eq!(kind.verb(), verb);
            assert_eq!(kind.object_type().as_str(), id);
        }
    }

    #[test]
    fn unknown_object_type_is_not_implemented() {
        let err = OperationKind::route("SortedSet", Verb::Delete).unwrap_err();
        assert!(matches!(
            &err,
            ConnectorError::NotImplemented { operation, object_type }
                if operation == "Delete" && object_type == "SortedSet"
        ));
        assert_eq!(
            err.to_string(),
            "Delete is not implemented for object type SortedSet"
        );
    }

    #[test]
    fn display_names_verb_and_type() {
        assert_eq!(OperationKind::UpsertHashSet.to_string(), "Upsert HashSet");
    }

    // --- Execution ---

    #[test]
    fn unknown_type_issues_no_commands() {
        let (connector, store) = connector();
        assert!(connector.operation("List", Verb::Get).is_err());
        assert!(store.commands().is_empty());
        assert_eq!(store.stats().clients_created(), 0);
    }

    #[test]
    fn verb_mismatch_is_rejected_before_commands() {
        let (connector, store) = connector();
        let op = connector.operation("String", Verb::Get).unwrap();
        let mut sink = CollectingResponse::new();
        let err = op
            .execute(
                Request::Delete(vec![ObjectIdItem::new(ItemId(1), "k")]),
                &mut sink,
            )
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        assert!(sink.is_empty());
        assert!(store.commands().is_empty());
    }

    #[test]
    fn each_operation_has_its_own_context() {
        let (connector, _store) = connector();
        let a = connector.operation("String", Verb::Get).unwrap();
        let b = connector.operation("String", Verb::Get).unwrap();
        assert_ne!(a.context_id(), b.context_id());
        assert!(format!("{a:?}").contains("GetString"));
    }

    #[test]
    fn operation_is_reusable_across_batches() {
        let (connector, store) = connector();
        store.seed_string("k", "v");
        let op = connector.operation("String", Verb::Get).unwrap();
        for _ in 0..2 {
            let mut sink = CollectingResponse::new();
            op.execute(Request::Get(vec![ObjectIdItem::new(ItemId(1), "k")]), &mut sink)
                .unwrap();
            assert!(sink.only(ItemId(1)).unwrap().is_success());
        }
        assert_eq!(store.stats().connections_opened(), 2);
        assert_eq!(store.stats().connections_closed(), 2);
        assert_eq!(store.stats().clients_created(), 1);
    }
}
