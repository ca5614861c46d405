//! Get handlers.

use std::collections::BTreeMap;

use tracing::debug;

use kvc_store::StoreResult;
use kvc_types::{ObjectIdItem, OperationResult, Payload, ResponseSink};

use super::{with_ttl, Context};
use crate::codec;

/// Fetches string values, one outcome per id.
pub fn string(ctx: &Context<'_>, items: &[ObjectIdItem], sink: &mut dyn ResponseSink) {
    for item in items {
        let Some(key) = ctx.key(item.object_id.as_deref()) else {
            ctx.missing_key(item.id, sink);
            continue;
        };
        match fetch_string(ctx, &key) {
            Ok(Some((value, ttl))) => {
                sink.add_result(OperationResult::success(item.id, with_ttl(Payload::new(value), ttl)))
            }
            Ok(None) => ctx.not_found(item.id, "Key not found".to_string(), sink),
            Err(e) => ctx.failure(item.id, &e, sink),
        }
    }
}

fn fetch_string(ctx: &Context<'_>, key: &str) -> StoreResult<Option<(String, i64)>> {
    let mut conn = ctx.conn.acquire()?;
    let Some(value) = conn.get(key)? else {
        debug!("'GET {key}' command returned nil");
        return Ok(None);
    };
    let ttl = conn.ttl(key)?;
    debug!("'TTL {key}' command returned {ttl}");
    Ok(Some((value, ttl)))
}

/// Fetches hashes, or a single field when the item selects one.
pub fn hashset(ctx: &Context<'_>, items: &[ObjectIdItem], sink: &mut dyn ResponseSink) {
    for item in items {
        let Some(key) = ctx.key(item.object_id.as_deref()) else {
            ctx.missing_key(item.id, sink);
            continue;
        };
        let field = item.field();
        match fetch_hash(ctx, &key, field) {
            Ok(Some((fields, ttl))) => {
                let payload = with_ttl(Payload::new(codec::encode(&fields)), ttl);
                sink.add_result(OperationResult::success(item.id, payload));
            }
            Ok(None) => {
                let message = match field {
                    Some(field) => format!("Key {key} / field {field} not found"),
                    None => format!("Key {key} not found"),
                };
                ctx.not_found(item.id, message, sink);
            }
            Err(e) => ctx.failure(item.id, &e, sink),
        }
    }
}

fn fetch_hash(
    ctx: &Context<'_>,
    key: &str,
    field: Option<&str>,
) -> StoreResult<Option<(BTreeMap<String, String>, i64)>> {
    let mut conn = ctx.conn.acquire()?;
    let fields = match field {
        Some(field) => conn
            .hget(key, field)?
            .map(|value| BTreeMap::from([(field.to_string(), value)]))
            .unwrap_or_default(),
        None => conn.hgetall(key)?,
    };
    debug!("'{}' returned {} field(s)", describe(key, field), fields.len());
    if fields.is_empty() {
        return Ok(None);
    }
    let ttl = conn.ttl(key)?;
    debug!("'TTL {key}' command returned {ttl}");
    Ok(Some((fields, ttl)))
}

fn describe(key: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("HGET {key} {field}"),
        None => format!("HGETALL {key}"),
    }
}
