use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};
use crate::topology::Topology;
use crate::traits::{ClientFactory, StoreClient, StoreConnection, TTL_MISSING, TTL_NO_EXPIRY};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Clone, Debug)]
enum Value {
    Str(String),
    Hash(BTreeMap<String, String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Lifecycle counters observed by tests.
#[derive(Debug, Default)]
pub struct StoreStats {
    clients_created: AtomicUsize,
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl StoreStats {
    pub fn clients_created(&self) -> usize {
        self.clients_created.load(Ordering::SeqCst)
    }

    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.connections_closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// In-memory emulation of the store commands.
///
/// Intended for tests and embedding. Every issued command is appended to a
/// wire-style log (`DEL a b`), expiry is tracked against the monotonic
/// clock, and failures can be injected per command name.
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    log: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
    replies: Mutex<HashMap<String, String>>,
    ttl_overrides: Mutex<HashMap<String, i64>>,
    refuse_connections: AtomicBool,
    stats: StoreStats,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            replies: Mutex::new(HashMap::new()),
            ttl_overrides: Mutex::new(HashMap::new()),
            refuse_connections: AtomicBool::new(false),
            stats: StoreStats::default(),
        }
    }

    /// A new store wrapped for sharing with clients.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    // -----------------------------------------------------------------------
    // Command log
    // -----------------------------------------------------------------------

    /// Every command issued so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().expect("lock poisoned").clone()
    }

    /// Number of issued commands with the given name.
    pub fn command_count(&self, name: &str) -> usize {
        self.log
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|line| line.split(' ').next() == Some(name))
            .count()
    }

    pub fn clear_commands(&self) {
        self.log.lock().expect("lock poisoned").clear();
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    /// Make every subsequent `command` fail with a connectivity error.
    pub fn fail_command(&self, command: &str, message: impl Into<String>) {
        self.failures
            .lock()
            .expect("lock poisoned")
            .insert(command.to_string(), message.into());
    }

    /// Make every subsequent command fail with a connectivity error.
    pub fn fail_all(&self, message: impl Into<String>) {
        self.fail_command("*", message);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock poisoned").clear();
    }

    /// Replace the acknowledgement of `SET`, `SETEX` or `PING`.
    pub fn override_reply(&self, command: &str, reply: impl Into<String>) {
        self.replies
            .lock()
            .expect("lock poisoned")
            .insert(command.to_string(), reply.into());
    }

    /// Force the `TTL` reply for a key.
    pub fn override_ttl(&self, key: &str, ttl: i64) {
        self.ttl_overrides
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), ttl);
    }

    /// Refuse new connections, as an unreachable node would.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    fn is_refusing(&self) -> bool {
        self.refuse_connections.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Direct data access (bypasses the command log)
    // -----------------------------------------------------------------------

    pub fn seed_string(&self, key: &str, value: &str) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), Entry::new(Value::Str(value.to_string())));
    }

    pub fn seed_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let map = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), Entry::new(Value::Hash(map)));
    }

    pub fn string_value(&self, key: &str) -> Option<String> {
        match self.live_entry(key)?.value {
            Value::Str(s) => Some(s),
            Value::Hash(_) => None,
        }
    }

    pub fn hash_value(&self, key: &str) -> Option<BTreeMap<String, String>> {
        match self.live_entry(key)?.value {
            Value::Hash(h) => Some(h),
            Value::Str(_) => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.live_entry(key).is_some()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, key: &str) -> Option<Entry> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(key)
            .filter(|e| !e.is_expired(Instant::now()))
            .cloned()
    }

    // -----------------------------------------------------------------------
    // Command execution
    // -----------------------------------------------------------------------

    fn issue(&self, name: &str, line: String) -> StoreResult<()> {
        self.log.lock().expect("lock poisoned").push(line);
        let failures = self.failures.lock().expect("lock poisoned");
        match failures.get(name).or_else(|| failures.get("*")) {
            Some(message) => Err(StoreError::Connectivity(message.clone())),
            None => Ok(()),
        }
    }

    fn reply(&self, command: &str, default: &str) -> String {
        self.replies
            .lock()
            .expect("lock poisoned")
            .get(command)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> T {
        let mut map = self.entries.write().expect("lock poisoned");
        let now = Instant::now();
        map.retain(|_, e| !e.is_expired(now));
        f(&mut map)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.issue("GET", format!("GET {key}"))?;
        self.with_entries(|map| match map.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::command("GET", WRONGTYPE)),
        })
    }

    fn set(&self, key: &str, value: &str, expiry: Option<u64>) -> StoreResult<String> {
        let (name, line) = match expiry {
            Some(seconds) => ("SETEX", format!("SETEX {key} {seconds} {value}")),
            None => ("SET", format!("SET {key} {value}")),
        };
        self.issue(name, line)?;
        if expiry == Some(0) {
            return Err(StoreError::command(
                "SETEX",
                "ERR invalid expire time in 'setex' command",
            ));
        }
        self.with_entries(|map| {
            let mut entry = Entry::new(Value::Str(value.to_string()));
            entry.expires_at = expiry.map(|s| Instant::now() + Duration::from_secs(s));
            map.insert(key.to_string(), entry);
        });
        Ok(self.reply(name, "OK"))
    }

    fn del(&self, keys: &[String]) -> StoreResult<u64> {
        self.issue("DEL", format!("DEL {}", keys.join(" ")).trim_end().to_string())?;
        if keys.is_empty() {
            return Err(StoreError::command(
                "DEL",
                "ERR wrong number of arguments for 'del' command",
            ));
        }
        Ok(self.with_entries(|map| keys.iter().filter(|k| map.remove(*k).is_some()).count() as u64))
    }

    fn hgetall(&self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        self.issue("HGETALL", format!("HGETALL {key}"))?;
        self.with_entries(|map| match map.get(key) {
            None => Ok(BTreeMap::new()),
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => Ok(h.clone()),
            Some(_) => Err(StoreError::command("HGETALL", WRONGTYPE)),
        })
    }

    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.issue("HGET", format!("HGET {key} {field}"))?;
        self.with_entries(|map| match map.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => Ok(h.get(field).cloned()),
            Some(_) => Err(StoreError::command("HGET", WRONGTYPE)),
        })
    }

    fn hset(&self, key: &str, fields: &BTreeMap<String, String>) -> StoreResult<u64> {
        let args: Vec<String> = fields.iter().map(|(f, v)| format!("{f} {v}")).collect();
        self.issue("HSET", format!("HSET {key} {}", args.join(" ")).trim_end().to_string())?;
        if fields.is_empty() {
            return Err(StoreError::command(
                "HSET",
                "ERR wrong number of arguments for 'hset' command",
            ));
        }
        self.with_entries(|map| {
            let entry = map
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(Value::Hash(BTreeMap::new())));
            match &mut entry.value {
                Value::Hash(h) => {
                    let mut added = 0;
                    for (f, v) in fields {
                        if h.insert(f.clone(), v.clone()).is_none() {
                            added += 1;
                        }
                    }
                    Ok(added)
                }
                Value::Str(_) => Err(StoreError::command("HSET", WRONGTYPE)),
            }
        })
    }

    fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
        self.issue("HDEL", format!("HDEL {key} {}", fields.join(" ")).trim_end().to_string())?;
        if fields.is_empty() {
            return Err(StoreError::command(
                "HDEL",
                "ERR wrong number of arguments for 'hdel' command",
            ));
        }
        self.with_entries(|map| {
            let (removed, now_empty) = match map.get_mut(key) {
                None => return Ok(0),
                Some(Entry {
                    value: Value::Hash(h),
                    ..
                }) => {
                    let removed = fields.iter().filter(|f| h.remove(*f).is_some()).count();
                    (removed as u64, h.is_empty())
                }
                Some(_) => return Err(StoreError::command("HDEL", WRONGTYPE)),
            };
            // An emptied hash ceases to exist.
            if now_empty {
                map.remove(key);
            }
            Ok(removed)
        })
    }

    fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.issue("EXPIRE", format!("EXPIRE {key} {seconds}"))?;
        Ok(self.with_entries(|map| {
            if seconds == 0 {
                return map.remove(key).is_some();
            }
            match map.get_mut(key) {
                Some(entry) => {
                    entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
                    true
                }
                None => false,
            }
        }))
    }

    fn ttl(&self, key: &str) -> StoreResult<i64> {
        self.issue("TTL", format!("TTL {key}"))?;
        if let Some(ttl) = self.ttl_overrides.lock().expect("lock poisoned").get(key) {
            return Ok(*ttl);
        }
        Ok(self.with_entries(|map| match map.get(key) {
            None => TTL_MISSING,
            Some(Entry {
                expires_at: None, ..
            }) => TTL_NO_EXPIRY,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(Instant::now());
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        }))
    }

    fn ping(&self) -> StoreResult<String> {
        self.issue("PING", "PING".to_string())?;
        Ok(self.reply("PING", "PONG"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("key_count", &self.len())
            .field("clients_created", &self.stats.clients_created())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client and connection
// ---------------------------------------------------------------------------

/// A connection to an [`InMemoryStore`].
pub struct InMemoryConnection {
    store: Arc<InMemoryStore>,
    open: bool,
}

impl InMemoryConnection {
    fn store(&self) -> StoreResult<&InMemoryStore> {
        if self.open {
            Ok(&self.store)
        } else {
            Err(StoreError::Connectivity("connection closed".into()))
        }
    }
}

impl StoreConnection for InMemoryConnection {
    fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.store()?.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<String> {
        self.store()?.set(key, value, None)
    }

    fn setex(&mut self, key: &str, seconds: u64, value: &str) -> StoreResult<String> {
        self.store()?.set(key, value, Some(seconds))
    }

    fn del(&mut self, keys: &[String]) -> StoreResult<u64> {
        self.store()?.del(keys)
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        self.store()?.hgetall(key)
    }

    fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.store()?.hget(key, field)
    }

    fn hset(&mut self, key: &str, fields: &BTreeMap<String, String>) -> StoreResult<u64> {
        self.store()?.hset(key, fields)
    }

    fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<u64> {
        self.store()?.hdel(key, fields)
    }

    fn expire(&mut self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.store()?.expire(key, seconds)
    }

    fn ttl(&mut self, key: &str) -> StoreResult<i64> {
        self.store()?.ttl(key)
    }

    fn ping(&mut self) -> StoreResult<String> {
        self.store()?.ping()
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.store.stats.connections_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Shared client producing [`InMemoryConnection`]s.
pub struct InMemoryClient {
    store: Arc<InMemoryStore>,
    shut_down: AtomicBool,
}

impl InMemoryClient {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl StoreClient for InMemoryClient {
    fn open(&self, topology: &Topology) -> StoreResult<Box<dyn StoreConnection>> {
        if self.is_shut_down() {
            return Err(StoreError::Disposed);
        }
        if self.store.is_refusing() {
            return Err(StoreError::Connectivity(format!(
                "connection refused: {}",
                topology.primary()
            )));
        }
        self.store.stats.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryConnection {
            store: Arc::clone(&self.store),
            open: true,
        }))
    }

    fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.store.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Factory creating [`InMemoryClient`]s over one shared store.
pub struct InMemoryClientFactory {
    store: Arc<InMemoryStore>,
    create_delay: Option<Duration>,
}

impl InMemoryClientFactory {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            create_delay: None,
        }
    }

    /// Sleep during client creation, widening the window for races.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn create(&self) -> StoreResult<Arc<dyn StoreClient>> {
        if let Some(delay) = self.create_delay {
            std::thread::sleep(delay);
        }
        self.store.stats.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemoryClient::new(Arc::clone(&self.store))))
    }
}
