//! Client for the hosted backend.
//!
//! The backend is an opaque collaborator: row storage with a REST query
//! surface (one route per table) and a password-auth endpoint. This module
//! provides the two clients the rest of the crate composes:
//!
//! - [`BackendClient`] - generic typed query client
//!   (`select`/`eq`/`in_`/`order`/`insert`/`update`/`delete`)
//! - [`AuthClient`] - sign-up / sign-in / sign-out with session state and
//!   auth-state-change notifications
//!
//! There is deliberately no cache between these clients and the screens;
//! every screen issues its own reads and owns the resulting rows.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::{AuthClient, AuthError, AuthEvent, AuthSubscription, AuthUser, Session};
pub use client::{BackendClient, OrderDirection, TokenSlot};
pub use types::*;

use thiserror::Error;

/// Errors from the backend's row-storage surface.
///
/// Reads and writes are distinguished because the storefront degrades them
/// differently: failed reads render as an inline message and an empty list,
/// failed writes abort the operation that issued them.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected a read.
    #[error("read from `{table}` failed with status {status}: {body}")]
    RemoteRead {
        table: String,
        status: u16,
        body: String,
    },

    /// The backend rejected a write.
    #[error("write to `{table}` failed with status {status}: {body}")]
    RemoteWrite {
        table: String,
        status: u16,
        body: String,
    },

    /// Rows arrived but did not match the expected shape.
    #[error("failed to decode rows from `{table}`: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single-row lookup matched nothing.
    #[error("no matching row in `{0}`")]
    NotFound(String),
}

impl BackendError {
    /// Whether this error came from a read (as opposed to a write or
    /// transport failure).
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::RemoteRead { .. } | Self::NotFound(_))
    }
}
