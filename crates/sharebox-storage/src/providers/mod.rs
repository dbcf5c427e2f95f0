//! Storage provider implementations.

pub mod local;
pub mod memory;
pub mod s3;
pub mod unconfigured;

pub use local::FilesystemStorageProvider;
pub use memory::MemoryStorageProvider;
pub use s3::S3StorageProvider;
pub use unconfigured::UnconfiguredProvider;
