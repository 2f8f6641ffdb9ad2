//! # datashare-database
//!
//! The transactional store boundary used by share processing, with a
//! PostgreSQL implementation built from per-entity repositories and an
//! in-memory implementation for tests and local runs.

pub mod connection;
pub mod migration;
pub mod queue;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use queue::TaskQueue;
#[cfg(feature = "memory")]
pub use store::memory::MemoryShareStore;
pub use store::postgres::PgShareStore;
pub use store::{ShareSession, ShareStore};
