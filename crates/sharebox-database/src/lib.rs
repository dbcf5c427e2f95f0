//! # sharebox-database
//!
//! PostgreSQL connection management, the record-store traits consumed by
//! the service layer, their sqlx implementations, and an in-memory
//! implementation used by tests and by database-less tooling.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{FileStore, FolderStore, ReverseShareStore};
