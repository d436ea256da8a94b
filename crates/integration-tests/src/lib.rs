//! Integration tests for Mercato.
//!
//! These tests wire real storefront components together (cart store, file
//! storage, change bus, order submitter) and only substitute the remote
//! backend, so they run without a network or a project to talk to.
//!
//! Run with: `cargo test -p mercato-integration-tests`
