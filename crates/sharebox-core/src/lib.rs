//! # sharebox-core
//!
//! Core crate for ShareBox. Contains the storage and notification traits,
//! configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other ShareBox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
