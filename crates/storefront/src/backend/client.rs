//! Generic typed query client for the backend's REST surface.
//!
//! Each remote table is addressed by name; filters, ordering, and
//! projections are query parameters in the backend's filter grammar
//! (`col=eq.value`, `order=col.desc`, ...). Row payloads are typed at the
//! boundary: every fetch deserializes into an explicit record type from
//! [`super::types`] rather than loose JSON.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::BackendConfig;

use super::BackendError;

/// Shared bearer-token slot.
///
/// Filled by the auth client when a user signs in and cleared on sign-out;
/// the query client reads it on every request so row-level security sees
/// the current user. There is exactly one slot per composition root.
pub type TokenSlot = Arc<RwLock<Option<String>>>;

/// Sort direction for `order` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend's row-storage REST surface.
///
/// Cheap to clone; all clones share one HTTP connection pool and one
/// bearer-token slot.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    rest_base: String,
    api_key: SecretString,
    bearer: TokenSlot,
}

impl BackendClient {
    /// Create a new backend client sharing `bearer` with the auth client.
    #[must_use]
    pub fn new(config: &BackendConfig, bearer: TokenSlot) -> Self {
        let rest_base = format!("{}/rest/v1", config.project_url.as_str().trim_end_matches('/'));

        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                rest_base,
                api_key: config.anon_key.clone(),
                bearer,
            }),
        }
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder {
            client: self,
            table: table.to_owned(),
            params: Vec::new(),
        }
    }

    /// Build a request with the standing auth headers.
    ///
    /// The `apikey` header always carries the publishable key; the bearer
    /// token is the signed-in user's access token when present, otherwise
    /// the publishable key again.
    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{table}", self.inner.rest_base);
        let bearer = self
            .inner
            .bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.inner.api_key.expose_secret().to_owned());

        self.inner
            .http
            .request(method, url)
            .header("apikey", self.inner.api_key.expose_secret())
            .bearer_auth(bearer)
    }
}

/// Truncate a response body for error diagnostics.
fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}

// =============================================================================
// Reads
// =============================================================================

/// A pending read against one table.
///
/// Built with [`BackendClient::from`]; consumed by one of the `fetch_*`
/// methods or converted into a write with `insert`/`update`/`delete`.
#[must_use]
pub struct QueryBuilder<'a> {
    client: &'a BackendClient,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> QueryBuilder<'a> {
    /// Project specific columns (defaults to `*`).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_owned(), columns.to_owned()));
        self
    }

    /// Keep rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Keep rows where `column` is one of `values`.
    pub fn in_<V: std::fmt::Display>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let joined = values
            .into_iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(",");
        self.params
            .push((column.to_owned(), format!("in.({joined})")));
        self
    }

    /// Order the result rows.
    pub fn order(mut self, column: &str, direction: OrderDirection) -> Self {
        self.params.push((
            "order".to_owned(),
            format!("{column}.{}", direction.suffix()),
        ));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, count: u32) -> Self {
        self.params.push(("limit".to_owned(), count.to_string()));
        self
    }

    /// Fetch all matching rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the backend rejects the query,
    /// `BackendError::Decode` if rows do not match `T`.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let response = self
            .client
            .request(Method::GET, &self.table)
            .query(&self.params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::RemoteRead {
                table: self.table,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| {
            tracing::error!(
                table = %self.table,
                body = %truncate_body(&body),
                "unexpected row shape from backend"
            );
            BackendError::Decode {
                table: self.table,
                source,
            }
        })
    }

    /// Fetch at most one row.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch`].
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let rows = self.limit(1).fetch::<T>().await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if nothing matched; otherwise same
    /// as [`Self::fetch`].
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        let table = self.table.clone();
        self.fetch_optional::<T>()
            .await?
            .ok_or(BackendError::NotFound(table))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one or more rows.
    pub fn insert<T: Serialize>(self, rows: T) -> InsertBuilder<'a, T> {
        InsertBuilder {
            client: self.client,
            table: self.table,
            rows,
        }
    }

    /// Patch all rows matching the filters already applied (plus any added
    /// afterwards).
    pub fn update<T: Serialize>(self, patch: T) -> UpdateBuilder<'a, T> {
        UpdateBuilder {
            client: self.client,
            table: self.table,
            params: self.params,
            patch,
        }
    }

    /// Delete all rows matching the filters already applied.
    pub fn delete(self) -> DeleteBuilder<'a> {
        DeleteBuilder {
            client: self.client,
            table: self.table,
            params: self.params,
        }
    }
}

/// A pending insert.
#[must_use]
pub struct InsertBuilder<'a, T: Serialize> {
    client: &'a BackendClient,
    table: String,
    rows: T,
}

impl<T: Serialize> InsertBuilder<'_, T> {
    /// Insert and return the created rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteWrite` if the insert is rejected,
    /// `BackendError::Decode` if the returned rows do not match `R`.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn returning<R: DeserializeOwned>(self) -> Result<Vec<R>, BackendError> {
        let response = self
            .client
            .request(Method::POST, &self.table)
            .header("Prefer", "return=representation")
            .json(&self.rows)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::RemoteWrite {
                table: self.table,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| BackendError::Decode {
            table: self.table,
            source,
        })
    }

    /// Insert without asking for the created rows back.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteWrite` if the insert is rejected.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn execute(self) -> Result<(), BackendError> {
        let response = self
            .client
            .request(Method::POST, &self.table)
            .header("Prefer", "return=minimal")
            .json(&self.rows)
            .send()
            .await?;

        check_write_status(&self.table, response).await
    }
}

/// A pending update.
#[must_use]
pub struct UpdateBuilder<'a, T: Serialize> {
    client: &'a BackendClient,
    table: String,
    params: Vec<(String, String)>,
    patch: T,
}

impl<T: Serialize> UpdateBuilder<'_, T> {
    /// Restrict the update to rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Apply the patch.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteWrite` if the update is rejected.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn execute(self) -> Result<(), BackendError> {
        let response = self
            .client
            .request(Method::PATCH, &self.table)
            .query(&self.params)
            .header("Prefer", "return=minimal")
            .json(&self.patch)
            .send()
            .await?;

        check_write_status(&self.table, response).await
    }
}

/// A pending delete.
#[must_use]
pub struct DeleteBuilder<'a> {
    client: &'a BackendClient,
    table: String,
    params: Vec<(String, String)>,
}

impl DeleteBuilder<'_> {
    /// Restrict the delete to rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Delete the matching rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteWrite` if the delete is rejected.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn execute(self) -> Result<(), BackendError> {
        let response = self
            .client
            .request(Method::DELETE, &self.table)
            .query(&self.params)
            .send()
            .await?;

        check_write_status(&self.table, response).await
    }
}

/// Map a write response to `Ok` or `RemoteWrite`.
async fn check_write_status(
    table: &str,
    response: reqwest::Response,
) -> Result<(), BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::RemoteWrite {
        table: table.to_owned(),
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}
