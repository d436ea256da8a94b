//! Catalog reads: products and categories.

use tracing::instrument;

use mercato_core::{CategoryId, ProductId};

use crate::backend::client::OrderDirection;
use crate::backend::{BackendClient, BackendError, Category, Product, tables};

/// Everything the home screen fetches up front.
#[derive(Debug, Clone)]
pub struct HomeCatalog {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

/// Read-through catalog queries.
pub struct CatalogService<'a> {
    backend: &'a BackendClient,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service over the shared backend client.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// All categories, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, BackendError> {
        self.backend
            .from(tables::CATEGORIES)
            .select("*")
            .order("name", OrderDirection::Ascending)
            .fetch()
            .await
    }

    /// All products, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, BackendError> {
        self.backend
            .from(tables::PRODUCTS)
            .select("*")
            .order("name", OrderDirection::Ascending)
            .fetch()
            .await
    }

    /// Products in one category, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn products_in_category(
        &self,
        category: &CategoryId,
    ) -> Result<Vec<Product>, BackendError> {
        self.backend
            .from(tables::PRODUCTS)
            .select("*")
            .eq("category_id", category)
            .order("name", OrderDirection::Ascending)
            .fetch()
            .await
    }

    /// A single product by id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn product(&self, product: &ProductId) -> Result<Product, BackendError> {
        self.backend
            .from(tables::PRODUCTS)
            .select("*")
            .eq("id", product)
            .fetch_one()
            .await
    }

    /// The home screen's initial load.
    ///
    /// Products and categories are independent fetches; they run
    /// concurrently and the first failure wins.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if either query fails.
    pub async fn home(&self) -> Result<HomeCatalog, BackendError> {
        let (products, categories) = tokio::try_join!(self.products(), self.categories())?;
        Ok(HomeCatalog {
            products,
            categories,
        })
    }
}
