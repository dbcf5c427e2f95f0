//! PostgreSQL implementations of the record-store traits.

pub mod file;
pub mod folder;
pub mod reverse_share;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use reverse_share::ReverseShareRepository;
