//! ftpmirror Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RelativePath`, `DirectorySnapshot`, `LocalDirectorySet`, `MonitorState`
//! - **Port definitions** - Traits for the remote store adapter: `IRemoteConnector`, `IRemoteSession`
//! - **Configuration** - YAML-backed settings for the remote, the local root and logging
//!
//! # Architecture
//!
//! The domain module contains pure logic with no I/O. Ports define the
//! trait interfaces that adapter crates (the FTP client) implement, and the
//! sync crate drives domain types through those ports.

pub mod config;
pub mod domain;
pub mod ports;
