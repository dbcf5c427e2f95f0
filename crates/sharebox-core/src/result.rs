//! Convenience result type alias for ShareBox.

use crate::error::AppError;

/// A specialized `Result` type for ShareBox operations.
pub type AppResult<T> = Result<T, AppError>;
