//! # Centers Common Library
//!
//! Shared code for the project-center management service:
//! - Database schema and domain models
//! - Field validation shared by form and CSV-import paths
//! - Configuration / data folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
