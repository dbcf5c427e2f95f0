//! Core traits defined in `sharebox-core` and implemented by other crates.

pub mod notifier;
pub mod storage;

pub use notifier::{Notifier, UploadDigest};
pub use storage::{ByteStream, CompletedPart, ProviderKind, StorageProvider};
