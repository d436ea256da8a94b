//! Password auth against the backend's auth endpoint.
//!
//! The backend owns credentials, verification, and token issuance; this
//! client only exchanges email/password for a session, keeps that session
//! in memory, and mirrors its access token into the shared [`TokenSlot`]
//! so row queries run as the signed-in user.
//!
//! Screens that care about auth (header, checkout, account) observe
//! [`AuthClient::on_auth_state_change`]; like the cart broadcaster, delivery
//! is synchronous and unreplayed, so observers also read
//! [`AuthClient::current_user`] eagerly on mount.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use mercato_core::{CustomerId, Email, EmailError};

use crate::config::BackendConfig;

use super::client::TokenSlot;

/// Errors from the auth endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format (rejected before any round-trip).
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an account.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// The backend rejected the password as too weak.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    /// Operation requires a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// Transport-level failure.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other rejection from the auth endpoint.
    #[error("auth request failed with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The auth endpoint answered with an unexpected shape.
    #[error("failed to decode auth response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The signed-in identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: CustomerId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An issued auth session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Auth state transition, delivered to `on_auth_state_change` observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

type AuthHandler = Arc<dyn Fn(AuthEvent) + Send + Sync>;

/// Disposer for an auth-state observer; unsubscribes on drop.
pub struct AuthSubscription {
    listeners: std::sync::Weak<Mutex<Vec<(u64, AuthHandler)>>>,
    id: u64,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// =============================================================================
// AuthClient
// =============================================================================

/// Client for the backend's password-auth endpoint.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    http: reqwest::Client,
    auth_base: String,
    api_key: SecretString,
    bearer: TokenSlot,
    session: RwLock<Option<Session>>,
    listeners: Arc<Mutex<Vec<(u64, AuthHandler)>>>,
    next_listener: AtomicU64,
}

impl AuthClient {
    /// Create a new auth client sharing `bearer` with the query client.
    #[must_use]
    pub fn new(config: &BackendConfig, bearer: TokenSlot) -> Self {
        let auth_base = format!("{}/auth/v1", config.project_url.as_str().trim_end_matches('/'));

        Self {
            inner: Arc::new(AuthClientInner {
                http: reqwest::Client::new(),
                auth_base,
                api_key: config.anon_key.clone(),
                bearer,
                session: RwLock::new(None),
                listeners: Arc::new(Mutex::new(Vec::new())),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// The currently signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    /// Observe auth state changes.
    ///
    /// The handler runs synchronously on the thread that changed the state,
    /// for every change after registration; there is no replay of earlier
    /// changes.
    pub fn on_auth_state_change(
        &self,
        handler: impl Fn(AuthEvent) + Send + Sync + 'static,
    ) -> AuthSubscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));

        AuthSubscription {
            listeners: Arc::downgrade(&self.inner.listeners),
            id,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Create an account.
    ///
    /// When the backend auto-confirms sign-ups it returns a session, which
    /// is installed immediately; otherwise the account exists but the user
    /// still has to sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::EmailTaken`,
    /// `AuthError::WeakPassword`, or `AuthError::Rejected`.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;

        let body = self
            .post("signup", &serde_json::json!({
                "email": email.as_str(),
                "password": password,
            }))
            .await?;

        match serde_json::from_str::<SignUpResponse>(&body)? {
            SignUpResponse::WithSession(session) => {
                let user = session.user.clone();
                self.install(session);
                Ok(user)
            }
            SignUpResponse::UserOnly(user) => Ok(user),
        }
    }

    /// Sign in with email and password, installing the issued session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::InvalidCredentials`.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;

        let body = self
            .post("token?grant_type=password", &serde_json::json!({
                "email": email.as_str(),
                "password": password,
            }))
            .await?;

        let session: Session = serde_json::from_str(&body)?;
        let user = session.user.clone();
        self.install(session);
        Ok(user)
    }

    /// Sign out.
    ///
    /// The local session is always cleared; revoking the token on the
    /// backend is best-effort, since the device must be able to sign out
    /// while offline.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let token = {
            let session = self
                .inner
                .session
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            session.as_ref().map(|s| s.access_token.clone())
        };

        if let Some(token) = token {
            let result = self
                .inner
                .http
                .post(format!("{}/logout", self.inner.auth_base))
                .header("apikey", self.inner.api_key.expose_secret())
                .bearer_auth(&token)
                .send()
                .await;

            if let Err(e) = result {
                tracing::warn!("failed to revoke session on backend: {e}");
            }

            self.clear();
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// POST a JSON body to an auth route, mapping failures to `AuthError`.
    async fn post(&self, route: &str, body: &serde_json::Value) -> Result<String, AuthError> {
        let response = self
            .inner
            .http
            .post(format!("{}/{route}", self.inner.auth_base))
            .header("apikey", self.inner.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_auth_failure(status.as_u16(), &body))
        }
    }

    /// Install a session: remember it, expose its token to row queries,
    /// notify observers.
    fn install(&self, session: Session) {
        *self
            .inner
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session.access_token.clone());
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.notify(AuthEvent::SignedIn);
    }

    /// Drop the session and fall back to the publishable key.
    fn clear(&self) {
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        *self
            .inner
            .bearer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.notify(AuthEvent::SignedOut);
    }

    fn notify(&self, event: AuthEvent) {
        // Snapshot under the lock, invoke outside it, so a handler may
        // subscribe or unsubscribe without deadlocking.
        let handlers: Vec<AuthHandler> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

/// Sign-up responses carry a session when the backend auto-confirms and a
/// bare user when email confirmation is pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession(Session),
    UserOnly(AuthUser),
}

/// Loose shape of auth endpoint error bodies.
#[derive(Deserialize, Default)]
struct AuthErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Map a non-success auth response to a typed error.
fn map_auth_failure(status: u16, body: &str) -> AuthError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.error)
        .unwrap_or_else(|| body.chars().take(200).collect());

    match parsed.error_code.as_deref() {
        Some("invalid_credentials") => return AuthError::InvalidCredentials,
        Some("user_already_exists" | "email_exists") => return AuthError::EmailTaken,
        Some("weak_password") => return AuthError::WeakPassword(message),
        _ => {}
    }

    // Older deployments only carry a message.
    let lower = message.to_lowercase();
    if lower.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if lower.contains("already registered") {
        AuthError::EmailTaken
    } else if lower.contains("password") && status == 422 {
        AuthError::WeakPassword(message)
    } else {
        AuthError::Rejected { status, message }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use url::Url;

    use super::*;

    fn test_client() -> AuthClient {
        let config = BackendConfig {
            project_url: Url::parse("https://abc123.example.co").unwrap(),
            anon_key: SecretString::from("sb_publishable_test_key_0000"),
        };
        AuthClient::new(&config, TokenSlot::default())
    }

    fn test_session(token: &str) -> Session {
        Session {
            access_token: token.to_owned(),
            refresh_token: None,
            expires_in: Some(3600),
            user: AuthUser {
                id: CustomerId::new("c1"),
                email: Some("buyer@example.com".to_owned()),
            },
        }
    }

    #[test]
    fn test_install_fills_bearer_slot_and_notifies() {
        let client = test_client();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _sub = client.on_auth_state_change(move |event| {
            seen_clone.lock().unwrap().push(event);
        });

        client.install(test_session("jwt-1"));
        assert_eq!(client.current_user().unwrap().id.as_str(), "c1");
        assert_eq!(
            client.inner.bearer.read().unwrap().as_deref(),
            Some("jwt-1")
        );

        client.clear();
        assert!(client.current_user().is_none());
        assert!(client.inner.bearer.read().unwrap().is_none());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![AuthEvent::SignedIn, AuthEvent::SignedOut]
        );
    }

    #[test]
    fn test_dropped_subscription_stops_delivery() {
        let client = test_client();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let sub = client.on_auth_state_change(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        client.install(test_session("jwt-1"));
        drop(sub);
        client.clear();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_map_auth_failure_by_error_code() {
        let err = map_auth_failure(
            400,
            r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = map_auth_failure(422, r#"{"error_code":"user_already_exists","msg":"x"}"#);
        assert!(matches!(err, AuthError::EmailTaken));

        let err = map_auth_failure(
            422,
            r#"{"error_code":"weak_password","msg":"Password should be at least 6 characters"}"#,
        );
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[test]
    fn test_map_auth_failure_by_message() {
        let err = map_auth_failure(400, r#"{"msg":"Invalid login credentials"}"#);
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = map_auth_failure(400, r#"{"msg":"User already registered"}"#);
        assert!(matches!(err, AuthError::EmailTaken));

        let err = map_auth_failure(500, "boom");
        assert!(matches!(err, AuthError::Rejected { status: 500, .. }));
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let with_session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"jwt","user":{"id":"c1","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::WithSession(_)));

        let user_only: SignUpResponse =
            serde_json::from_str(r#"{"id":"c1","email":"a@b.c"}"#).unwrap();
        assert!(matches!(user_only, SignUpResponse::UserOnly(_)));
    }
}
