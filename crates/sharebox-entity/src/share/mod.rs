//! Reverse-share entities.

pub mod reverse;

pub use reverse::{CreateReverseShareFile, ReverseShare, ReverseShareFile};
