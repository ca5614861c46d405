use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::topology::Topology;

/// `TTL` reply for a key that exists without an expiry.
pub const TTL_NO_EXPIRY: i64 = -1;
/// `TTL` reply for a key that does not exist (or just expired).
pub const TTL_MISSING: i64 = -2;

/// A live link to the store, scoped to one execution context.
///
/// Each method issues exactly one store command and blocks for the round
/// trip. Keys passed in are already prefixed; implementations never
/// rewrite them.
pub trait StoreConnection: Send {
    /// `GET key`. `Ok(None)` when the key is absent.
    fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// `SET key value`. Returns the raw acknowledgement.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<String>;

    /// `SETEX key seconds value`. Returns the raw acknowledgement.
    fn setex(&mut self, key: &str, seconds: u64, value: &str) -> StoreResult<String>;

    /// `DEL key [key ...]`. Returns the number of keys removed.
    fn del(&mut self, keys: &[String]) -> StoreResult<u64>;

    /// `HGETALL key`. Empty when the key is absent.
    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    /// `HGET key field`.
    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// `HSET key field value [field value ...]` in a single command.
    /// Returns the number of fields added.
    fn hset(&mut self, key: &str, fields: &BTreeMap<String, String>) -> StoreResult<u64>;

    /// `HDEL key field [field ...]`. Returns the number of fields removed.
    fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<u64>;

    /// `EXPIRE key seconds`. `true` if the timeout was set.
    fn expire(&mut self, key: &str, seconds: u64) -> StoreResult<bool>;

    /// `TTL key`: remaining seconds, [`TTL_NO_EXPIRY`] or [`TTL_MISSING`].
    fn ttl(&mut self, key: &str) -> StoreResult<i64>;

    /// `PING`. Returns the raw reply.
    fn ping(&mut self) -> StoreResult<String>;

    /// Close the link. Commands issued afterwards fail.
    fn close(&mut self);
}

/// The shared client, able to produce connections to a node topology.
pub trait StoreClient: Send + Sync {
    /// Open a replicated connection to the topology.
    fn open(&self, topology: &Topology) -> StoreResult<Box<dyn StoreConnection>>;

    /// Release all client resources. Called at most once by the manager.
    fn shutdown(&self);
}

/// Creates the shared client for a connector instance.
pub trait ClientFactory: Send + Sync {
    fn create(&self) -> StoreResult<Arc<dyn StoreClient>>;
}
