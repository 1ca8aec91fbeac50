//! Integration tests for ftpmirror-ftp
//!
//! Runs a scripted in-process FTP server on a loopback port and verifies
//! end-to-end behavior of the connector and session: login, listing,
//! directory navigation, uploads and timeouts.

mod common;

mod test_listing;
mod test_login;
mod test_upload;
