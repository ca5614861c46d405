//! Store access for the key-value connector.
//!
//! This crate owns everything between an operation handler and the wire:
//! the command surface handlers use, the node topology, the Redis-backed
//! client, an in-memory emulation for tests and embedding, and the
//! connection lifecycle manager that shares one client per connector
//! instance and one connection per execution context.
//!
//! # Backends
//!
//! All backends implement [`StoreClient`] and hand out [`StoreConnection`]s:
//!
//! - [`RedisClient`] -- `redis` crate, primary-preferred replica reads
//! - [`InMemoryClient`] -- emulated store with command log and counters
//!
//! # Lifecycle Rules
//!
//! 1. At most one shared client exists per [`ConnectionManager`]; it is
//!    created on first use and shut down at most once.
//! 2. An [`ExecutionConnection`] opens at most one connection at a time and
//!    reuses it for every command of its context.
//! 3. Releasing a connection is idempotent and happens on every exit path.
//! 4. Construction failures are returned to the caller, never retried.

pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod replicated;
pub mod topology;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use lifecycle::{ConnectionLease, ConnectionManager, ExecutionConnection, ReleaseOnDrop};
pub use memory::{InMemoryClient, InMemoryClientFactory, InMemoryStore, StoreStats};
pub use replicated::{Link, RedisClient, RedisClientFactory, ReplicatedConnection};
pub use topology::{NodeAddress, Topology};
pub use traits::{ClientFactory, StoreClient, StoreConnection, TTL_MISSING, TTL_NO_EXPIRY};
