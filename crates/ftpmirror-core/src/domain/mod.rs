//! Domain entities and business logic
//!
//! This module contains the core domain types for ftpmirror:
//! - Newtypes for validated, slash-normalized relative paths
//! - Directory sets for the remote snapshot and the local scan
//! - The monitor state machine owned by the reconciliation engine
//! - Domain-specific error types

pub mod errors;
pub mod monitor;
pub mod newtypes;
pub mod snapshot;

// Re-export commonly used types
pub use errors::DomainError;
pub use monitor::{MonitorPhase, MonitorState};
pub use newtypes::RelativePath;
pub use snapshot::{DirectorySnapshot, LocalDirectorySet};
