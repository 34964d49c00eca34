//! # lightcontrol-adapter-storage-sqlite-sqlx
//!
//! `SQLite` state store adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `StateStore` port defined in `lightcontrol-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Keep key expiry in the database so TTLs survive restarts
//!
//! Publish/subscribe is not persisted: channels are delivered in-process,
//! matching the at-most-once, no-replay contract of the port.
//!
//! ## Dependency rule
//! Depends on `lightcontrol-app` (for port traits) and `lightcontrol-domain` (for error types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod state_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use state_store::SqliteStateStore;
