//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the shared client of a connector instance.
//! [`ExecutionConnection`] owns the connection of one execution context (a
//! browse call or an operation batch) and hands it out through
//! [`ConnectionLease`]s.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::topology::Topology;
use crate::traits::{ClientFactory, StoreClient, StoreConnection};

/// Owns the shared client for one connector instance.
///
/// The client is created on the first call to [`Self::client`] and torn
/// down by [`Self::dispose`] (or drop). Once created, the client is read
/// without locking. Creation and disposal serialize on one mutex, so
/// concurrent callers never create more than one client and the client is
/// shut down at most once.
pub struct ConnectionManager {
    factory: Box<dyn ClientFactory>,
    topology: Topology,
    client: OnceLock<Arc<dyn StoreClient>>,
    disposed: AtomicBool,
    init: Mutex<()>,
}

impl ConnectionManager {
    pub fn new(factory: Box<dyn ClientFactory>, topology: Topology) -> Self {
        Self {
            factory,
            topology,
            client: OnceLock::new(),
            disposed: AtomicBool::new(false),
            init: Mutex::new(()),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    // Creation and disposal hold no state under the lock, so a poisoned
    // guard is still safe to use.
    fn lock_init(&self) -> MutexGuard<'_, ()> {
        match self.init.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The shared client, created on first use.
    pub fn client(&self) -> StoreResult<Arc<dyn StoreClient>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(StoreError::Disposed);
        }
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let _guard = self.lock_init();
        if self.disposed.load(Ordering::Acquire) {
            return Err(StoreError::Disposed);
        }
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }
        info!(topology = %self.topology, "creating shared store client");
        let client = self.factory.create()?;
        Ok(Arc::clone(self.client.get_or_init(|| client)))
    }

    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some() && !self.is_disposed()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Shut down the shared client. Further calls are no-ops.
    pub fn dispose(&self) {
        let _guard = self.lock_init();
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(client) = self.client.get() {
            client.shutdown();
            info!("shared store client disposed");
        }
    }

    /// A fresh execution context bound to this manager.
    pub fn context(self: &Arc<Self>) -> ExecutionConnection {
        ExecutionConnection::new(Arc::clone(self))
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("topology", &self.topology.to_string())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

type Handle = Option<Box<dyn StoreConnection>>;

/// The connection of one execution context.
///
/// Opens lazily on the first [`Self::acquire`], is reused for every later
/// command, and is closed at most once by [`Self::release`] or drop. The
/// type is `Sync`: concurrent acquirers share the single connection, one
/// command at a time.
pub struct ExecutionConnection {
    id: Uuid,
    manager: Arc<ConnectionManager>,
    handle: Mutex<Handle>,
}

impl ExecutionConnection {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            id: Uuid::now_v7(),
            manager,
            handle: Mutex::new(None),
        }
    }

    /// Identifier of the execution context, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    // A panic while a lease is held poisons the mutex; the handle is still
    // usable and must still be closed.
    fn lock_handle(&self) -> MutexGuard<'_, Handle> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Borrow the connection, opening it on first use.
    pub fn acquire(&self) -> StoreResult<ConnectionLease<'_>> {
        let mut guard = self.lock_handle();
        if guard.is_none() {
            let client = self.manager.client()?;
            let conn = client.open(self.manager.topology())?;
            debug!(context = %self.id, "store connection opened");
            *guard = Some(conn);
        }
        Ok(ConnectionLease { guard })
    }

    pub fn is_open(&self) -> bool {
        self.lock_handle().is_some()
    }

    /// Close the connection if one is open.
    pub fn release(&self) {
        if let Some(mut conn) = self.lock_handle().take() {
            conn.close();
            debug!(context = %self.id, "store connection released");
        }
    }

    /// A guard that releases the connection when it goes out of scope.
    pub fn scoped(&self) -> ReleaseOnDrop<'_> {
        ReleaseOnDrop { conn: self }
    }
}

impl Drop for ExecutionConnection {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ExecutionConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionConnection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Exclusive access to an open connection.
pub struct ConnectionLease<'a> {
    guard: MutexGuard<'a, Handle>,
}

impl Deref for ConnectionLease<'_> {
    type Target = dyn StoreConnection;

    fn deref(&self) -> &Self::Target {
        self.guard
            .as_deref()
            .expect("lease is only created over an open connection")
    }
}

impl DerefMut for ConnectionLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard
            .as_deref_mut()
            .expect("lease is only created over an open connection")
    }
}

/// Releases an [`ExecutionConnection`] on every exit path.
pub struct ReleaseOnDrop<'a> {
    conn: &'a ExecutionConnection,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.conn.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryClientFactory, InMemoryStore};
    use std::thread;
    use std::time::Duration;

    fn manager(store: &Arc<InMemoryStore>) -> Arc<ConnectionManager> {
        let factory = InMemoryClientFactory::new(Arc::clone(store))
            .with_create_delay(Duration::from_millis(5));
        Arc::new(ConnectionManager::new(
            Box::new(factory),
            Topology::parse("redis://primary:6379;redis://replica:6379").unwrap(),
        ))
    }

    // -----------------------------------------------------------------------
    // Shared client
    // -----------------------------------------------------------------------

    #[test]
    fn client_is_created_lazily_once() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        assert!(!mgr.is_initialized());
        assert_eq!(store.stats().clients_created(), 0);

        let a = mgr.client().unwrap();
        let b = mgr.client().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.stats().clients_created(), 1);
    }

    #[test]
    fn ready_client_is_read_without_the_init_lock() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let first = mgr.client().unwrap();

        let _held = mgr.lock_init();
        let (tx, rx) = std::sync::mpsc::channel();
        let reader = Arc::clone(&mgr);
        thread::spawn(move || {
            let _ = tx.send(reader.client());
        });
        let second = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("client() should not wait on creation")
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.stats().clients_created(), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        mgr.client().unwrap();
        mgr.dispose();
        mgr.dispose();
        assert!(mgr.is_disposed());
        assert!(!mgr.is_initialized());
        assert_eq!(store.stats().shutdowns(), 1);
        assert_eq!(mgr.client().err(), Some(StoreError::Disposed));
    }

    #[test]
    fn dispose_before_use_creates_nothing() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        mgr.dispose();
        assert_eq!(store.stats().clients_created(), 0);
        assert_eq!(store.stats().shutdowns(), 0);
    }

    #[test]
    fn drop_disposes_client() {
        let store = InMemoryStore::shared();
        {
            let mgr = manager(&store);
            mgr.client().unwrap();
        }
        assert_eq!(store.stats().shutdowns(), 1);
    }

    // -----------------------------------------------------------------------
    // Execution connections
    // -----------------------------------------------------------------------

    #[test]
    fn connection_is_reused_within_context() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = mgr.context();
        assert!(!ctx.is_open());
        ctx.acquire().unwrap().ping().unwrap();
        ctx.acquire().unwrap().ping().unwrap();
        assert!(ctx.is_open());
        assert_eq!(store.stats().connections_opened(), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = mgr.context();
        ctx.release();
        ctx.acquire().unwrap();
        ctx.release();
        ctx.release();
        drop(ctx);
        assert_eq!(store.stats().connections_opened(), 1);
        assert_eq!(store.stats().connections_closed(), 1);
    }

    #[test]
    fn acquire_after_release_reopens() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = mgr.context();
        ctx.acquire().unwrap();
        ctx.release();
        ctx.acquire().unwrap();
        assert_eq!(store.stats().connections_opened(), 2);
        assert_eq!(store.stats().clients_created(), 1);
    }

    #[test]
    fn scoped_guard_releases_on_early_return() {
        fn run(ctx: &ExecutionConnection) -> StoreResult<()> {
            let _release = ctx.scoped();
            ctx.acquire()?.ping()?;
            Err(StoreError::Connectivity("bail".into()))
        }

        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = mgr.context();
        assert!(run(&ctx).is_err());
        assert!(!ctx.is_open());
        assert_eq!(store.stats().connections_closed(), 1);
    }

    #[test]
    fn scoped_guard_releases_on_panic() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = mgr.context();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _release = ctx.scoped();
            let _lease = ctx.acquire().unwrap();
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(!ctx.is_open());
        assert_eq!(store.stats().connections_closed(), 1);
    }

    #[test]
    fn open_failure_propagates() {
        let store = InMemoryStore::shared();
        store.refuse_connections(true);
        let mgr = manager(&store);
        let ctx = mgr.context();
        assert!(matches!(ctx.acquire().err(), Some(StoreError::Connectivity(_))));
        assert!(!ctx.is_open());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_first_acquire_creates_one_client_and_connection() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);
        let ctx = Arc::new(mgr.context());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    ctx.acquire().unwrap().ping().unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(store.stats().clients_created(), 1);
        assert_eq!(store.stats().connections_opened(), 1);
        assert_eq!(store.command_count("PING"), 8);
    }

    #[test]
    fn concurrent_contexts_share_one_client() {
        let store = InMemoryStore::shared();
        let mgr = manager(&store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                thread::spawn(move || {
                    let ctx = mgr.context();
                    ctx.acquire().unwrap().ping().unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(store.stats().clients_created(), 1);
        assert_eq!(store.stats().connections_opened(), 8);
        assert_eq!(store.stats().connections_closed(), 8);
    }
}
