//! Redis-backed store client.
//!
//! A [`ReplicatedConnection`] holds one synchronous link per reachable
//! node. Writes always go to the primary. Reads prefer the
//! primary and fall back to replicas, in listed order, when the primary
//! link fails with an I/O error.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use redis::{Cmd, ConnectionLike, FromRedisValue, RedisError};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::topology::{NodeAddress, Topology};
use crate::traits::{ClientFactory, StoreClient, StoreConnection};

fn map_error(command: &str, err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
        StoreError::Connectivity(format!("{command}: {err}"))
    } else {
        StoreError::command(command, err.to_string())
    }
}

/// One link to a store node.
pub type Link = Box<dyn ConnectionLike + Send>;

struct NodeConnection {
    node: NodeAddress,
    conn: Link,
}

/// A connection spanning the primary and its read replicas.
pub struct ReplicatedConnection {
    primary: Option<NodeConnection>,
    replicas: Vec<NodeConnection>,
}

impl ReplicatedConnection {
    fn connect(clients: &[(NodeAddress, redis::Client)]) -> StoreResult<Self> {
        let links = clients
            .iter()
            .map(|(node, client)| {
                let link = client
                    .get_connection()
                    .map(|conn| Box::new(conn) as Link)
                    .map_err(|e| map_error("CONNECT", e));
                (node.clone(), link)
            })
            .collect();
        Self::from_links(links)
    }

    /// Builds a connection from per-node link attempts, primary first.
    ///
    /// Unreachable nodes are skipped. Fails only when no node is reachable.
    pub fn from_links(links: Vec<(NodeAddress, StoreResult<Link>)>) -> StoreResult<Self> {
        let mut nodes = Vec::with_capacity(links.len());
        let mut last_err = None;
        for (node, link) in links {
            match link {
                Ok(conn) => nodes.push(Some(NodeConnection { node, conn })),
                Err(e) => {
                    warn!(node = %node, error = %e, "store node unreachable");
                    last_err = Some(e);
                    nodes.push(None);
                }
            }
        }

        if nodes.iter().all(Option::is_none) {
            return Err(last_err
                .unwrap_or_else(|| StoreError::Connectivity("no store nodes configured".into())));
        }

        let mut nodes = nodes.into_iter();
        let primary = nodes.next().flatten();
        let replicas = nodes.flatten().collect();
        Ok(Self { primary, replicas })
    }

    /// Number of nodes this connection is linked to.
    pub fn linked_nodes(&self) -> usize {
        self.replicas.len() + usize::from(self.primary.is_some())
    }

    fn write<T: FromRedisValue>(&mut self, name: &str, cmd: &Cmd) -> StoreResult<T> {
        let primary = self
            .primary
            .as_mut()
            .ok_or_else(|| StoreError::Connectivity("primary node is unavailable".into()))?;
        cmd.query(&mut *primary.conn).map_err(|e| map_error(name, e))
    }

    fn read<T: FromRedisValue>(&mut self, name: &str, cmd: &Cmd) -> StoreResult<T> {
        let mut last_err = None;
        for node in self.primary.iter_mut().chain(self.replicas.iter_mut()) {
            match cmd.query::<T>(&mut *node.conn) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_io_error() => {
                    warn!(node = %node.node, command = name, error = %e, "read failed, trying next node");
                    last_err = Some(map_error(name, e));
                }
                Err(e) => return Err(map_error(name, e)),
            }
        }
        Err(last_err.unwrap_or_else(|| StoreError::Connectivity("connection closed".into())))
    }
}

impl StoreConnection for ReplicatedConnection {
    fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.read("GET", redis::cmd("GET").arg(key))
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<String> {
        self.write("SET", redis::cmd("SET").arg(key).arg(value))
    }

    fn setex(&mut self, key: &str, seconds: u64, value: &str) -> StoreResult<String> {
        self.write("SETEX", redis::cmd("SETEX").arg(key).arg(seconds).arg(value))
    }

    fn del(&mut self, keys: &[String]) -> StoreResult<u64> {
        self.write("DEL", redis::cmd("DEL").arg(keys))
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        self.read("HGETALL", redis::cmd("HGETALL").arg(key))
    }

    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.read("HGET", redis::cmd("HGET").arg(key).arg(field))
    }

    fn hset(&mut self, key: &str, fields: &BTreeMap<String, String>) -> StoreResult<u64> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.write("HSET", &cmd)
    }

    fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<u64> {
        self.write("HDEL", redis::cmd("HDEL").arg(key).arg(fields))
    }

    fn expire(&mut self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.write("EXPIRE", redis::cmd("EXPIRE").arg(key).arg(seconds))
    }

    fn ttl(&mut self, key: &str) -> StoreResult<i64> {
        self.read("TTL", redis::cmd("TTL").arg(key))
    }

    fn ping(&mut self) -> StoreResult<String> {
        self.read("PING", &redis::cmd("PING"))
    }

    fn close(&mut self) {
        // Dropping a link closes its socket.
        self.primary = None;
        self.replicas.clear();
    }
}

/// The shared Redis client for one connector instance.
///
/// Holds one `redis::Client` per node URL, created on first use and reused
/// by every connection opened afterwards.
pub struct RedisClient {
    clients: RwLock<HashMap<String, redis::Client>>,
    shut_down: AtomicBool,
}

impl RedisClient {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    fn node_client(&self, node: &NodeAddress) -> StoreResult<redis::Client> {
        if let Some(client) = self.clients.read().expect("lock poisoned").get(node.url()) {
            return Ok(client.clone());
        }
        let mut clients = self.clients.write().expect("lock poisoned");
        if let Some(client) = clients.get(node.url()) {
            return Ok(client.clone());
        }
        let client = redis::Client::open(node.url())
            .map_err(|e| StoreError::Config(format!("invalid node address {node}: {e}")))?;
        clients.insert(node.url().to_string(), client.clone());
        Ok(client)
    }
}

impl Default for RedisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for RedisClient {
    fn open(&self, topology: &Topology) -> StoreResult<Box<dyn StoreConnection>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(StoreError::Disposed);
        }
        let clients = topology
            .nodes()
            .iter()
            .map(|node| Ok((node.clone(), self.node_client(node)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        let conn = ReplicatedConnection::connect(&clients)?;
        debug!(topology = %topology, linked = conn.linked_nodes(), "opened replicated connection");
        Ok(Box::new(conn))
    }

    fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.clients.write().expect("lock poisoned").clear();
            info!("redis client shut down");
        }
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.clients.read().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("RedisClient")
            .field("node_clients", &nodes)
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

/// Creates a [`RedisClient`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RedisClientFactory;

impl ClientFactory for RedisClientFactory {
    fn create(&self) -> StoreResult<Arc<dyn StoreClient>> {
        info!("creating shared redis client");
        Ok(Arc::new(RedisClient::new()))
    }
}
