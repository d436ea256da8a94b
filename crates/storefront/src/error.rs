//! Crate-level error type.
//!
//! Each subsystem keeps its own error enum; this type is the union the
//! composition root and embedding UI layers see. `user_message` is the
//! only place technical errors are flattened into copy fit for a screen.

use thiserror::Error;

use crate::backend::{AuthError, BackendError};
use crate::cart::PersistenceError;
use crate::config::ConfigError;
use crate::services::CheckoutError;

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Union of the storefront's subsystem errors.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl StorefrontError {
    /// A short message suitable for directly rendering to the buyer.
    ///
    /// Deliberately vague about transport and server details; the full
    /// error stays in the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "The app is not configured correctly.",
            Self::Backend(e) if e.is_read() => "Couldn't load this screen. Pull to refresh.",
            Self::Backend(_) => "Something went wrong talking to the store.",
            Self::Auth(e) => auth_message(e),
            Self::Persistence(_) => "Couldn't save your cart on this device.",
            Self::Checkout(e) => checkout_message(e),
        }
    }
}

const fn auth_message(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidEmail(_) => "That email address doesn't look right.",
        AuthError::InvalidCredentials => "Wrong email or password.",
        AuthError::EmailTaken => "An account with that email already exists.",
        AuthError::WeakPassword(_) => "Please pick a longer password.",
        AuthError::NotSignedIn => "Please sign in first.",
        _ => "Sign-in is unavailable right now.",
    }
}

const fn checkout_message(error: &CheckoutError) -> &'static str {
    match error {
        CheckoutError::AddressMissing => "Add a delivery address before checking out.",
        _ => "Your order could not be placed. Please try again.",
    }
}
