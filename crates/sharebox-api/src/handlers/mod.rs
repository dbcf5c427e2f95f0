//! Route handlers organized by domain.

pub mod bulk;
pub mod file;
pub mod folder;
pub mod health;
pub mod reverse_share;
pub mod storage;
