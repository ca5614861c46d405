//! Delete handlers.
//!
//! Valid keys are deduplicated before any command is issued, so a key named
//! twice in one batch is deleted once and both items succeed.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use kvc_store::{StoreError, StoreResult};
use kvc_types::{ItemId, ObjectIdItem, OperationResult, ResponseSink};

use super::Context;

/// Keys in first-seen order with the items that named them.
#[derive(Debug, Default)]
struct Group {
    targets: Vec<String>,
    seen: HashSet<String>,
    items: Vec<ItemId>,
}

impl Group {
    fn add(&mut self, target: &str, item: ItemId) {
        if self.seen.insert(target.to_string()) {
            self.targets.push(target.to_string());
        }
        self.items.push(item);
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn succeed(&self, sink: &mut dyn ResponseSink) {
        for &item in &self.items {
            sink.add_result(OperationResult::empty_success(item));
        }
    }

    fn fail(&self, ctx: &Context<'_>, err: &StoreError, sink: &mut dyn ResponseSink) {
        for &item in &self.items {
            ctx.failure(item, err, sink);
        }
    }
}

/// Deletes one key per item with a single multi-key `DEL`.
pub fn keys(ctx: &Context<'_>, items: &[ObjectIdItem], sink: &mut dyn ResponseSink) {
    let mut group = Group::default();
    for item in items {
        match ctx.key(item.object_id.as_deref()) {
            Some(key) => group.add(&key, item.id),
            None => ctx.missing_key(item.id, sink),
        }
    }
    if group.is_empty() {
        return;
    }
    match del(ctx, &group.targets) {
        Ok(()) => group.succeed(sink),
        Err(e) => group.fail(ctx, &e, sink),
    }
}

fn del(ctx: &Context<'_>, keys: &[String]) -> StoreResult<()> {
    let deleted = ctx.conn.acquire()?.del(keys)?;
    debug!("'DEL {}' command returned {deleted}", keys.join(" "));
    Ok(())
}

/// Deletes whole hashes, or selected fields when an item names one.
///
/// Whole-key deletions share one `DEL`; field deletions issue one `HDEL`
/// per key. Field groups are reported by key, not in input order.
pub fn hashset(ctx: &Context<'_>, items: &[ObjectIdItem], sink: &mut dyn ResponseSink) {
    let mut whole = Group::default();
    let mut by_key: BTreeMap<String, Group> = BTreeMap::new();
    for item in items {
        let Some(key) = ctx.key(item.object_id.as_deref()) else {
            ctx.missing_key(item.id, sink);
            continue;
        };
        match item.field() {
            Some(field) => by_key.entry(key).or_default().add(field, item.id),
            None => whole.add(&key, item.id),
        }
    }

    if let Err(e) = delete_groups(ctx, &mut whole, &mut by_key, sink) {
        // Confirmed groups have been drained; fail whatever is left.
        whole.fail(ctx, &e, sink);
        for group in by_key.values() {
            group.fail(ctx, &e, sink);
        }
    }
}

fn delete_groups(
    ctx: &Context<'_>,
    whole: &mut Group,
    by_key: &mut BTreeMap<String, Group>,
    sink: &mut dyn ResponseSink,
) -> StoreResult<()> {
    if whole.is_empty() && by_key.is_empty() {
        return Ok(());
    }
    let mut conn = ctx.conn.acquire()?;

    if !whole.is_empty() {
        let deleted = conn.del(&whole.targets)?;
        debug!("'DEL {}' command returned {deleted}", whole.targets.join(" "));
        std::mem::take(whole).succeed(sink);
    }

    while let Some((key, group)) = by_key.pop_first() {
        match conn.hdel(&key, &group.targets) {
            Ok(removed) => {
                debug!("'HDEL {key} {}' command returned {removed}", group.targets.join(" "));
                group.succeed(sink);
            }
            Err(e) => {
                by_key.insert(key, group);
                return Err(e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use kvc_types::{
        CollectingResponse, ItemId, ObjectIdItem, OperationStatus, Request, ResultCode, Verb,
    };

    use crate::handler::testing::{connector, field_item, id_item};

    fn delete(
        connector: &crate::Connector,
        object_type: &str,
        items: Vec<ObjectIdItem>,
    ) -> CollectingResponse {
        let mut sink = CollectingResponse::new();
        connector
            .operation(object_type, Verb::Delete)
            .unwrap()
            .execute(Request::Delete(items), &mut sink)
            .unwrap();
        sink
    }

    // --- Generic ---

    #[test]
    fn duplicate_keys_issue_one_del() {
        let (connector, store) = connector();
        store.seed_string("A", "1");
        store.seed_string("B", "2");
        let sink = delete(
            &connector,
            "String",
            vec![id_item(1, "A"), id_item(2, "A"), id_item(3, "B")],
        );
        assert_eq!(store.commands(), vec!["DEL A B"]);
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.count_status(OperationStatus::Success), 3);
        assert!(sink.results().iter().all(|r| r.payload.is_none()));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_keys_are_excluded() {
        let (connector, store) = connector();
        let sink = delete(
            &connector,
            "String",
            vec![ObjectIdItem::without_id(ItemId(1)), id_item(2, "k")],
        );
        assert_eq!(sink.only(ItemId(1)).unwrap().code, ResultCode::NoKey);
        assert!(sink.only(ItemId(2)).unwrap().is_success());
        assert_eq!(store.commands(), vec!["DEL k"]);
    }

    #[test]
    fn no_valid_keys_issues_nothing() {
        let (connector, store) = connector();
        let sink = delete(&connector, "String", vec![id_item(1, "")]);
        assert_eq!(sink.len(), 1);
        assert!(store.commands().is_empty());
        assert_eq!(store.stats().connections_opened(), 0);
    }

    #[test]
    fn del_failure_fails_every_pending_item() {
        let (connector, store) = connector();
        store.fail_command("DEL", "connection lost");
        let sink = delete(
            &connector,
            "String",
            vec![id_item(1, "a"), ObjectIdItem::without_id(ItemId(2)), id_item(3, "b")],
        );
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.only(ItemId(2)).unwrap().code, ResultCode::NoKey);
        for n in [1, 3] {
            let result = sink.only(ItemId(n)).unwrap();
            assert_eq!(result.status, OperationStatus::Failure);
            assert_eq!(result.message.as_deref(), Some("store connectivity error: connection lost"));
        }
    }

    #[test]
    fn refused_connection_fails_items() {
        let (connector, store) = connector();
        store.refuse_connections(true);
        let sink = delete(&connector, "String", vec![id_item(1, "a")]);
        assert_eq!(sink.only(ItemId(1)).unwrap().status, OperationStatus::Failure);
    }

    // --- HashSet ---

    #[test]
    fn hashset_duplicates_without_field() {
        let (connector, store) = connector();
        let sink = delete(
            &connector,
            "HashSet",
            vec![id_item(1, "A"), id_item(2, "A"), id_item(3, "B")],
        );
        assert_eq!(store.commands(), vec!["DEL A B"]);
        assert_eq!(sink.count_status(OperationStatus::Success), 3);
    }

    #[test]
    fn hashset_groups_fields_by_key() {
        let (connector, store) = connector();
        store.seed_hash("h", &[("a", "1"), ("b", "2"), ("c", "3")]);
        store.seed_hash("g", &[("x", "1")]);
        store.seed_string("s", "v");
        let sink = delete(
            &connector,
            "HashSet",
            vec![
                field_item(1, "h", "a"),
                field_item(2, "g", "x"),
                id_item(3, "s"),
                field_item(4, "h", "b"),
                field_item(5, "h", "a"),
            ],
        );
        assert_eq!(store.commands(), vec!["DEL s", "HDEL g x", "HDEL h a b"]);
        assert_eq!(sink.len(), 5);
        let order: Vec<_> = sink.results().iter().map(|r| r.item.0).collect();
        assert_eq!(order, vec![3, 2, 1, 4, 5]);
        assert_eq!(store.hash_value("h").unwrap().len(), 1);
        assert!(!store.contains_key("g"));
    }

    #[test]
    fn hashset_failure_spares_confirmed_groups() {
        let (connector, store) = connector();
        store.seed_hash("h", &[("a", "1")]);
        store.fail_command("HDEL", "reset by peer");
        let sink = delete(
            &connector,
            "HashSet",
            vec![id_item(1, "k"), field_item(2, "h", "a"), field_item(3, "i", "b")],
        );
        assert_eq!(sink.len(), 3);
        assert!(sink.only(ItemId(1)).unwrap().is_success());
        for n in [2, 3] {
            assert_eq!(sink.only(ItemId(n)).unwrap().status, OperationStatus::Failure);
        }
    }

    #[test]
    fn hashset_del_failure_fails_all_groups() {
        let (connector, store) = connector();
        store.fail_command("DEL", "down");
        let sink = delete(
            &connector,
            "HashSet",
            vec![id_item(1, "k"), field_item(2, "h", "a")],
        );
        assert_eq!(sink.count_status(OperationStatus::Failure), 2);
        assert_eq!(store.command_count("HDEL"), 0);
    }
}
