//! Favorites: per-customer starred products.

use tracing::instrument;

use mercato_core::{CustomerId, ProductId};

use crate::backend::client::OrderDirection;
use crate::backend::{BackendClient, BackendError, Favorite, NewFavorite, Product, tables};

/// A favorite joined with its product row.
#[derive(Debug, Clone)]
pub struct FavoriteProduct {
    pub favorite: Favorite,
    pub product: Product,
}

/// Read and toggle favorites.
pub struct FavoritesService<'a> {
    backend: &'a BackendClient,
}

impl<'a> FavoritesService<'a> {
    /// Create a favorites service over the shared backend client.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// The customer's favorites, newest first, joined in memory against
    /// `products` by id.
    ///
    /// Favorites whose product row has disappeared are skipped
    /// (warn-logged), not surfaced as errors.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if either query fails.
    #[instrument(skip(self), fields(customer = %customer))]
    pub async fn list(&self, customer: &CustomerId) -> Result<Vec<FavoriteProduct>, BackendError> {
        let favorites: Vec<Favorite> = self
            .backend
            .from(tables::FAVORITES)
            .select("*")
            .eq("customer_id", customer)
            .order("created_at", OrderDirection::Descending)
            .fetch()
            .await?;

        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let products: Vec<Product> = self
            .backend
            .from(tables::PRODUCTS)
            .select("*")
            .in_("id", favorites.iter().map(|f| f.product_id.clone()))
            .fetch()
            .await?;

        Ok(favorites
            .into_iter()
            .filter_map(|favorite| {
                let product = products.iter().find(|p| p.id == favorite.product_id);
                match product {
                    Some(product) => Some(FavoriteProduct {
                        product: product.clone(),
                        favorite,
                    }),
                    None => {
                        tracing::warn!(
                            product = %favorite.product_id,
                            "favorite references a missing product, skipping"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    /// Whether the customer has favorited this product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    pub async fn contains(
        &self,
        customer: &CustomerId,
        product: &ProductId,
    ) -> Result<bool, BackendError> {
        let existing: Option<Favorite> = self
            .backend
            .from(tables::FAVORITES)
            .select("*")
            .eq("customer_id", customer)
            .eq("product_id", product)
            .fetch_optional()
            .await?;

        Ok(existing.is_some())
    }

    /// Star or unstar a product. Returns `true` when it is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the lookup fails,
    /// `BackendError::RemoteWrite` if the insert or delete fails.
    #[instrument(skip(self), fields(customer = %customer, product = %product))]
    pub async fn toggle(
        &self,
        customer: &CustomerId,
        product: &ProductId,
    ) -> Result<bool, BackendError> {
        if self.contains(customer, product).await? {
            self.backend
                .from(tables::FAVORITES)
                .delete()
                .eq("customer_id", customer)
                .eq("product_id", product)
                .execute()
                .await?;
            Ok(false)
        } else {
            self.backend
                .from(tables::FAVORITES)
                .insert(NewFavorite {
                    customer_id: customer.clone(),
                    product_id: product.clone(),
                })
                .execute()
                .await?;
            Ok(true)
        }
    }
}
