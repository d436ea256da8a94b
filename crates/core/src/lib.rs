//! Mercato Core - Shared types library.
//!
//! This crate provides common types used across all Mercato components:
//!
//! - `storefront` - the headless storefront library embedded by the mobile shell
//! - `integration-tests` - cross-crate end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
