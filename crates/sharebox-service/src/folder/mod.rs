//! Folder hierarchy queries and folder management.

pub mod hierarchy;
pub mod service;

pub use hierarchy::FolderHierarchy;
pub use service::{FolderDeletion, FolderService};
