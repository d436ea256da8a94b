//! Mercato Storefront - headless core of the mobile storefront.
//!
//! This crate provides everything the mobile shell needs short of rendering:
//!
//! - A typed query client for the hosted backend (`products`, `categories`,
//!   `orders`, `order_items`, `favorites`, `users_`, `transactions`) plus
//!   password auth against its auth endpoint
//! - The device-local shopping cart: persisted blob, write-through store,
//!   and a cross-screen change broadcaster
//! - Services backing each screen: catalog, favorites, order history,
//!   account, and the checkout flow
//!
//! # Architecture
//!
//! All shared pieces are wired once in [`state::AppState`] and handed to
//! screens by reference. Screens own their fetched rows; there is no cache
//! layer between them and the backend. Remote calls are plain futures, so
//! dropping a screen's task cancels its in-flight request.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod services;
pub mod state;

pub use error::{Result, StorefrontError};
pub use state::AppState;
