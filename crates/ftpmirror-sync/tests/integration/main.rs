//! Integration tests for ftpmirror-sync
//!
//! Drives the reconciliation engine end to end against the in-memory
//! remote: full passes, idempotence, connection loss and the change event
//! bridge feeding a running engine.

mod common;

mod test_bridge;
mod test_reconcile;
mod test_reconnect;
