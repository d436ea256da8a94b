//! Order submission.
//!
//! Submission is a fixed sequence of remote writes with no transaction
//! around them: look up the delivery address, create the order row, insert
//! its items, record the payment audit row, then clear the local cart and
//! raise the post-purchase flag. The steps that must not be silently lost
//! (order, items) abort on failure; the audit row and the flag are
//! best-effort.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::instrument;

use mercato_core::{CustomerId, OrderId, PaymentMethod, PaymentStatus};

use crate::backend::{
    BackendClient, BackendError, DeliveryAddress, NewOrder, NewOrderItem, NewTransaction, Order,
    Profile, tables,
};
use crate::cart::{Cart, CartStore, PersistenceError};

/// Where the last submission attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Errors from order submission.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The profile has no usable delivery address; nothing was written.
    #[error("no delivery address on file")]
    AddressMissing,

    /// The order row was rejected; nothing was written.
    #[error("order creation failed: {source}")]
    OrderCreateFailed {
        #[source]
        source: BackendError,
    },

    /// The items insert was rejected after the order row was created.
    ///
    /// The order row is left behind; callers should surface `order_id` so
    /// support can reconcile it.
    #[error("item insert for order `{order_id}` failed: {source}")]
    ItemsInsertFailed {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },

    /// Any other backend failure (the address lookup).
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Clearing the local cart after a placed order failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

// =============================================================================
// Backend seam
// =============================================================================

/// The remote writes submission needs, as a seam for tests.
///
/// [`BackendClient`] is the production implementation; tests substitute a
/// recording double so the submission sequence can be asserted without a
/// server.
pub trait OrdersApi {
    /// The customer's stored delivery address, if any.
    fn delivery_address(
        &self,
        customer: &CustomerId,
    ) -> impl Future<Output = Result<Option<DeliveryAddress>, BackendError>> + Send;

    /// Create the order row and return it.
    fn create_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, BackendError>> + Send;

    /// Insert the order's item rows.
    fn create_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Record the payment audit row.
    fn record_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

impl OrdersApi for BackendClient {
    async fn delivery_address(
        &self,
        customer: &CustomerId,
    ) -> Result<Option<DeliveryAddress>, BackendError> {
        let profile: Option<Profile> = self
            .from(tables::USERS)
            .select("*")
            .eq("id", customer)
            .fetch_optional()
            .await?;

        Ok(profile.as_ref().and_then(Profile::delivery_address))
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        let rows: Vec<Order> = self.from(tables::ORDERS).insert(order).returning().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(tables::ORDERS.to_owned()))
    }

    async fn create_order_items(&self, items: &[NewOrderItem]) -> Result<(), BackendError> {
        self.from(tables::ORDER_ITEMS).insert(items).execute().await
    }

    async fn record_transaction(&self, transaction: &NewTransaction) -> Result<(), BackendError> {
        self.from(tables::TRANSACTIONS)
            .insert(transaction)
            .execute()
            .await
    }
}

// =============================================================================
// OrderSubmitter
// =============================================================================

/// Drives the submission sequence and tracks its state.
///
/// One submitter per checkout screen; the state is for that screen's
/// button and banner, not shared across screens.
pub struct OrderSubmitter<B: OrdersApi> {
    backend: B,
    cart: CartStore,
    state: Mutex<SubmitState>,
}

impl<B: OrdersApi> OrderSubmitter<B> {
    /// Create a submitter over the shared backend and cart store.
    #[must_use]
    pub fn new(backend: B, cart: CartStore) -> Self {
        Self {
            backend,
            cart,
            state: Mutex::new(SubmitState::Idle),
        }
    }

    /// The state of the last (or in-flight) submission attempt.
    #[must_use]
    pub fn state(&self) -> SubmitState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SubmitState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Submit the current cart as an order.
    ///
    /// `Ok(None)` is the quiet no-op: no signed-in customer, an empty
    /// cart, or a submission already in flight. The state only leaves
    /// `Idle` once the preconditions hold.
    ///
    /// On success the cart is cleared (which broadcasts) and the
    /// post-purchase flag is raised for the next screen to consume.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]; any error leaves the state at `Failed`.
    #[instrument(skip(self), fields(payment_method = %payment_method))]
    pub async fn submit(
        &self,
        customer: Option<&CustomerId>,
        payment_method: PaymentMethod,
    ) -> Result<Option<Order>, CheckoutError> {
        if self.state() == SubmitState::Submitting {
            return Ok(None);
        }

        let Some(customer) = customer else {
            return Ok(None);
        };

        let cart = self.cart.load();
        if cart.is_empty() {
            return Ok(None);
        }

        self.set_state(SubmitState::Submitting);
        match self.run(customer, payment_method, &cart).await {
            Ok(order) => {
                self.set_state(SubmitState::Succeeded);
                Ok(Some(order))
            }
            Err(e) => {
                self.set_state(SubmitState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        customer: &CustomerId,
        payment_method: PaymentMethod,
        cart: &Cart,
    ) -> Result<Order, CheckoutError> {
        let address = self
            .backend
            .delivery_address(customer)
            .await?
            .ok_or(CheckoutError::AddressMissing)?;

        let order = self
            .backend
            .create_order(&new_order(customer, payment_method, cart, &address))
            .await
            .map_err(|source| CheckoutError::OrderCreateFailed { source })?;

        let items: Vec<NewOrderItem> = cart
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id.clone(),
                product_id: line.id.clone(),
                quantity: line.quantity,
                price_at_purchase: line.price,
            })
            .collect();

        self.backend
            .create_order_items(&items)
            .await
            .map_err(|source| CheckoutError::ItemsInsertFailed {
                order_id: order.id.clone(),
                source,
            })?;

        // Audit trail only; a placed order is not failed over it.
        if let Err(e) = self
            .backend
            .record_transaction(&NewTransaction {
                order_id: order.id.clone(),
                customer_id: customer.clone(),
                amount: cart.total(),
                payment_method,
                status: PaymentStatus::Pending,
            })
            .await
        {
            tracing::warn!(order = %order.id, "transaction record failed: {e}");
        }

        self.cart.clear()?;
        if let Err(e) = self.cart.set_purchase_flag() {
            tracing::warn!("purchase flag not stored: {e}");
        }

        Ok(order)
    }
}

fn new_order(
    customer: &CustomerId,
    payment_method: PaymentMethod,
    cart: &Cart,
    address: &DeliveryAddress,
) -> NewOrder {
    NewOrder {
        customer_id: customer.clone(),
        total_amount: cart.total(),
        order_status: mercato_core::OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_method,
        delivery_address: address.address.clone(),
        delivery_city: address.city.clone(),
        delivery_postal_code: address.postal_code.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use mercato_core::{OrderStatus, Price, ProductId};

    use crate::cart::{CartLine, InProcessBus, MemoryStorage};

    use super::*;

    /// Recording double for [`OrdersApi`].
    struct FakeBackend {
        address: Option<DeliveryAddress>,
        fail_items: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeBackend {
        fn new(address: Option<DeliveryAddress>) -> Self {
            Self {
                address,
                fail_items: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl OrdersApi for &FakeBackend {
        async fn delivery_address(
            &self,
            _customer: &CustomerId,
        ) -> Result<Option<DeliveryAddress>, BackendError> {
            self.record("address");
            Ok(self.address.clone())
        }

        async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
            self.record("order");
            Ok(Order {
                id: OrderId::new("order-1"),
                customer_id: order.customer_id.clone(),
                total_amount: order.total_amount,
                order_status: order.order_status,
                payment_status: order.payment_status,
                payment_method: order.payment_method,
                delivery_address: Some(order.delivery_address.clone()),
                delivery_city: order.delivery_city.clone(),
                delivery_postal_code: order.delivery_postal_code.clone(),
                created_at: None,
            })
        }

        async fn create_order_items(&self, _items: &[NewOrderItem]) -> Result<(), BackendError> {
            self.record("items");
            if self.fail_items {
                return Err(BackendError::RemoteWrite {
                    table: tables::ORDER_ITEMS.to_owned(),
                    status: 403,
                    body: String::new(),
                });
            }
            Ok(())
        }

        async fn record_transaction(
            &self,
            _transaction: &NewTransaction,
        ) -> Result<(), BackendError> {
            self.record("transaction");
            Ok(())
        }
    }

    fn cart_store() -> CartStore {
        CartStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(InProcessBus::new()),
        )
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            address: "12 Market St".to_owned(),
            city: Some("Lagos".to_owned()),
            postal_code: None,
        }
    }

    fn seed_cart(store: &CartStore) {
        store
            .add_or_toggle(CartLine::new(
                ProductId::new("p1"),
                "Olive oil",
                Price::new(dec!(12.50)),
                "",
                2,
            ))
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_customer_is_a_quiet_noop() {
        let backend = FakeBackend::new(Some(address()));
        let store = cart_store();
        seed_cart(&store);
        let submitter = OrderSubmitter::new(&backend, store.clone());

        let placed = submitter.submit(None, PaymentMethod::Card).await.unwrap();

        assert!(placed.is_none());
        assert_eq!(submitter.state(), SubmitState::Idle);
        assert!(backend.calls().is_empty());
        assert!(!store.load().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_a_quiet_noop() {
        let backend = FakeBackend::new(Some(address()));
        let submitter = OrderSubmitter::new(&backend, cart_store());
        let customer = CustomerId::new("c1");

        let placed = submitter
            .submit(Some(&customer), PaymentMethod::Card)
            .await
            .unwrap();

        assert!(placed.is_none());
        assert_eq!(submitter.state(), SubmitState::Idle);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_address_aborts_before_any_write() {
        let backend = FakeBackend::new(None);
        let store = cart_store();
        seed_cart(&store);
        let submitter = OrderSubmitter::new(&backend, store.clone());
        let customer = CustomerId::new("c1");

        let err = submitter
            .submit(Some(&customer), PaymentMethod::CashOnDelivery)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AddressMissing));
        assert_eq!(submitter.state(), SubmitState::Failed);
        assert_eq!(backend.calls(), vec!["address"]);
        assert!(!store.load().is_empty());
    }

    #[tokio::test]
    async fn test_successful_submission_runs_the_full_sequence() {
        let backend = FakeBackend::new(Some(address()));
        let store = cart_store();
        seed_cart(&store);
        let submitter = OrderSubmitter::new(&backend, store.clone());
        let customer = CustomerId::new("c1");

        let order = submitter
            .submit(Some(&customer), PaymentMethod::CashOnDelivery)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.total_amount.amount(), dec!(25.00));
        assert_eq!(order.delivery_address.as_deref(), Some("12 Market St"));
        assert_eq!(
            backend.calls(),
            vec!["address", "order", "items", "transaction"]
        );
        assert_eq!(submitter.state(), SubmitState::Succeeded);

        // The cart is gone and the success flag reads exactly once.
        assert!(store.load().is_empty());
        assert!(store.take_purchase_flag());
        assert!(!store.take_purchase_flag());
    }

    #[tokio::test]
    async fn test_items_failure_reports_the_orphaned_order() {
        let mut backend = FakeBackend::new(Some(address()));
        backend.fail_items = true;
        let store = cart_store();
        seed_cart(&store);
        let submitter = OrderSubmitter::new(&backend, store.clone());
        let customer = CustomerId::new("c1");

        let err = submitter
            .submit(Some(&customer), PaymentMethod::Card)
            .await
            .unwrap_err();

        match err {
            CheckoutError::ItemsInsertFailed { order_id, .. } => {
                assert_eq!(order_id.as_str(), "order-1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(submitter.state(), SubmitState::Failed);
        // The cart survives so the buyer can retry.
        assert!(!store.load().is_empty());
        assert!(!store.take_purchase_flag());
    }
}
