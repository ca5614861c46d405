//! Upsert handlers.
//!
//! Both handlers process every item of the batch. A failure on one item is
//! reported for that item and processing continues.

use std::collections::BTreeMap;

use tracing::debug;

use kvc_store::StoreResult;
use kvc_types::{ObjectDataItem, OperationResult, Payload, ResponseSink, ResultCode};

use super::Context;
use crate::codec;

/// Acknowledgement expected from `SET` and `SETEX`.
pub const SET_OK: &str = "OK";

/// Stores string values, with `SETEX` when the item carries a TTL.
pub fn string(ctx: &Context<'_>, items: &[ObjectDataItem], sink: &mut dyn ResponseSink) {
    for item in items {
        let Some(key) = ctx.key(item.key()) else {
            ctx.missing_key(item.id, sink);
            continue;
        };
        let value = match std::str::from_utf8(&item.data) {
            Ok(value) => value,
            Err(e) => {
                sink.add_result(OperationResult::application_error(
                    item.id,
                    ResultCode::BadInput,
                    format!("payload is not valid UTF-8: {e}"),
                    None,
                ));
                continue;
            }
        };
        match store_string(ctx, &key, item.ttl(), value) {
            Ok(reply) if reply == SET_OK => {
                sink.add_result(OperationResult::success(item.id, Payload::new(item.data.clone())))
            }
            Ok(reply) => sink.add_result(OperationResult::application_error(
                item.id,
                ResultCode::Err,
                reply,
                Some(Payload::new(item.data.clone())),
            )),
            Err(e) => ctx.failure(item.id, &e, sink),
        }
    }
}

fn store_string(ctx: &Context<'_>, key: &str, ttl: i64, value: &str) -> StoreResult<String> {
    let mut conn = ctx.conn.acquire()?;
    let reply = match u64::try_from(ttl) {
        Ok(seconds) => {
            let reply = conn.setex(key, seconds, value)?;
            debug!("'SETEX {key} {seconds}' command returned {reply}");
            reply
        }
        Err(_) => {
            let reply = conn.set(key, value)?;
            debug!("'SET {key}' command returned {reply}");
            reply
        }
    };
    Ok(reply)
}

/// Writes hash documents with one `HSET`, then `EXPIRE` when a TTL is set.
pub fn hashset(ctx: &Context<'_>, items: &[ObjectDataItem], sink: &mut dyn ResponseSink) {
    for item in items {
        let Some(key) = ctx.key(item.key()) else {
            ctx.missing_key(item.id, sink);
            continue;
        };
        let fields = match codec::decode(&item.data) {
            Ok(fields) => fields,
            Err(e) => {
                sink.add_result(OperationResult::application_error(
                    item.id,
                    ResultCode::BadInput,
                    e.to_string(),
                    None,
                ));
                continue;
            }
        };
        match store_hash(ctx, &key, item.ttl(), &fields) {
            Ok(()) => {
                sink.add_result(OperationResult::success(item.id, Payload::new(item.data.clone())))
            }
            Err(e) => ctx.failure(item.id, &e, sink),
        }
    }
}

fn store_hash(
    ctx: &Context<'_>,
    key: &str,
    ttl: i64,
    fields: &BTreeMap<String, String>,
) -> StoreResult<()> {
    let mut conn = ctx.conn.acquire()?;
    let added = conn.hset(key, fields)?;
    debug!("'HSET {key}' command returned {added}");
    if let Ok(seconds) = u64::try_from(ttl) {
        let applied = conn.expire(key, seconds)?;
        debug!("'EXPIRE {key} {seconds}' command returned {}", u8::from(applied));
    }
    Ok(())
}
