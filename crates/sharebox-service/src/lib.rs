//! # sharebox-service
//!
//! Business logic for ShareBox. Services receive their record stores and
//! storage provider as `Arc` trait objects at construction time.

pub mod archive;
pub mod context;
pub mod folder;
pub mod notification;
pub mod share;

pub use archive::{ArchiveEntry, BulkArchiveBuilder};
pub use context::{ServiceContext, Stores};
pub use folder::{FolderHierarchy, FolderService};
pub use notification::{LogNotifier, WebhookNotifier};
pub use share::{ReverseShareService, UploadSessionAggregator};
