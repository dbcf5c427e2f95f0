//! # sharebox-entity
//!
//! Domain entity models for ShareBox. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod share;
