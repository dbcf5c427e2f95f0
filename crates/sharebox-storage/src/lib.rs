//! # sharebox-storage
//!
//! Object storage for ShareBox: resolution of the connection settings,
//! the provider implementations (S3-compatible object store, legacy
//! filesystem, unconfigured placeholder, in-memory test double), the
//! direct-vs-proxied URL strategy, and server-side transfers.

pub mod disposition;
pub mod manager;
pub mod providers;
pub mod resolver;
pub mod strategy;
pub mod tls;
pub mod transfer;

pub use manager::StorageManager;
pub use strategy::{Delivery, TransferUrl, UrlStrategy};
