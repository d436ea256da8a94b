//! Screen-facing services.
//!
//! One thin service per screen concern: catalog browsing, favorites, order
//! history, account/profile, and the checkout flow. Each is a borrow over
//! the shared [`crate::backend::BackendClient`], constructed per call site
//! via [`crate::state::AppState`]; none of them cache.

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod favorites;
pub mod orders;

pub use account::AccountService;
pub use catalog::{CatalogService, HomeCatalog};
pub use checkout::{CheckoutError, OrderSubmitter, OrdersApi, SubmitState};
pub use favorites::{FavoriteProduct, FavoritesService};
pub use orders::{OrderHistoryService, PurchasedItem};
