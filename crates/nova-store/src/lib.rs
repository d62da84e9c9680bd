//! Persistence for nova-core state: a small key-value contract, a SQLite
//! implementation of it, and typed JSON helpers for each engine entity.

pub mod error;
pub mod paths;
pub mod schema;
pub mod state;
pub mod store;

pub use error::{Result, StoreError};
pub use paths::{default_base_dir, open_in_dir};
pub use store::{KvStore, MemoryKv, SqliteStore};
