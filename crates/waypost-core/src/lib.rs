//! Waypost Core Library
//!
//! This crate provides the report data model, error types and configuration
//! shared by the reporter and the applications embedding it.

pub mod config;
pub mod error;
pub mod report;

// Re-export commonly used types
pub use config::{ReporterConfig, ServerConfig, Verbosity};
pub use error::EncodeError;
pub use report::{ErrorReport, Outcome};
