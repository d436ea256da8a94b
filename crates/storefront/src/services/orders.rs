//! Order history reads.

use tracing::instrument;

use mercato_core::{CustomerId, OrderId};

use crate::backend::client::OrderDirection;
use crate::backend::{BackendClient, BackendError, Order, OrderItem, Product, tables};

/// An order item joined with its product row, when that row still exists.
///
/// The item's `price_at_purchase` and `quantity` are authoritative; the
/// product is display garnish (name, image) and may be gone for old
/// orders.
#[derive(Debug, Clone)]
pub struct PurchasedItem {
    pub item: OrderItem,
    pub product: Option<Product>,
}

/// Read-through order history queries.
pub struct OrderHistoryService<'a> {
    backend: &'a BackendClient,
}

impl<'a> OrderHistoryService<'a> {
    /// Create an order history service over the shared backend client.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if the query fails.
    #[instrument(skip(self), fields(customer = %customer))]
    pub async fn orders(&self, customer: &CustomerId) -> Result<Vec<Order>, BackendError> {
        self.backend
            .from(tables::ORDERS)
            .select("*")
            .eq("customer_id", customer)
            .order("created_at", OrderDirection::Descending)
            .fetch()
            .await
    }

    /// The items of one order, joined in memory against `products` by id.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::RemoteRead` if either query fails.
    #[instrument(skip(self), fields(order = %order))]
    pub async fn items(&self, order: &OrderId) -> Result<Vec<PurchasedItem>, BackendError> {
        let items: Vec<OrderItem> = self
            .backend
            .from(tables::ORDER_ITEMS)
            .select("*")
            .eq("order_id", order)
            .fetch()
            .await?;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let products: Vec<Product> = self
            .backend
            .from(tables::PRODUCTS)
            .select("*")
            .in_("id", items.iter().map(|i| i.product_id.clone()))
            .fetch()
            .await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let product = products.iter().find(|p| p.id == item.product_id).cloned();
                PurchasedItem { item, product }
            })
            .collect())
    }
}
