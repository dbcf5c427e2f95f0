//! Reverse shares and upload notification batching.

pub mod reverse;
pub mod session;

pub use reverse::{MultipartUpload, PresignedUpload, RegisterUpload, ReverseShareService};
pub use session::{UploadEvent, UploadSessionAggregator};
