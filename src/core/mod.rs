//! Core domain types, configuration and errors for nodemeter.
//!
//! Everything else in the crate builds on the types defined here.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, StorageBackendKind};
pub use error::{NodemeterError, Result};
pub use types::{validate_metric_name, Point, Role, Timestamp};
