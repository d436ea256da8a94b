//! Typed rows for the backend tables.
//!
//! Every row crossing the wire is validated into one of these records at
//! the boundary; nothing downstream handles loose JSON. Nullable columns
//! are `Option` and absent columns (narrow `select` projections) fall back
//! to `serde(default)`, so a projection mismatch degrades to `None` rather
//! than a decode failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mercato_core::{
    CategoryId, CustomerId, FavoriteId, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, Price, ProductId, TransactionId,
};

/// Remote table names.
pub mod tables {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const FAVORITES: &str = "favorites";
    pub const TRANSACTIONS: &str = "transactions";
    /// The profile table. The trailing underscore is part of the remote
    /// schema, not a typo.
    pub const USERS: &str = "users_";
}

// =============================================================================
// Catalog
// =============================================================================

/// A row from `products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A row from `categories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A row from `favorites`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `favorites`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFavorite {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
}

// =============================================================================
// Profile
// =============================================================================

/// A row from `users_` (the buyer profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: CustomerId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Profile {
    /// The stored delivery address, if one is on file.
    ///
    /// A profile without a street line has no usable address; city and
    /// postal code alone do not count.
    #[must_use]
    pub fn delivery_address(&self) -> Option<DeliveryAddress> {
        let address = self.address.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }

        Some(DeliveryAddress {
            address: address.to_owned(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
        })
    }
}

/// Delivery address fields, frozen onto each order at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

/// Patch payload for the profile's address fields.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPatch {
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl From<&DeliveryAddress> for AddressPatch {
    fn from(address: &DeliveryAddress) -> Self {
        Self {
            address: address.address.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A row from `orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Price,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default)]
    pub delivery_postal_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub total_amount: Price,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub delivery_city: Option<String>,
    pub delivery_postal_code: Option<String>,
}

/// A row from `order_items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price at submission time; later catalog price changes do not
    /// affect placed orders.
    pub price_at_purchase: Price,
}

/// Insert payload for `order_items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Price,
}

// =============================================================================
// Transactions
// =============================================================================

/// A row from `transactions` (best-effort audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub amount: Price,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
}

/// Insert payload for `transactions`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub amount: Price,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
}
