//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync engine depends on these traits; the
//! FTP adapter crate implements them.
//!
//! ## Ports Overview
//!
//! - [`IRemoteConnector`] - Opens and authenticates sessions against the remote store
//! - [`IRemoteSession`] - Directory listing, navigation, directory creation and file upload

pub mod remote_store;

pub use remote_store::{IRemoteConnector, IRemoteSession, TransportError};
