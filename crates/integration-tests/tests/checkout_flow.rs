//! End-to-end order submission over a real cart store.
//!
//! The remote backend is the only substituted piece: a recording double
//! captures every write the submitter issues so the sequence, the frozen
//! prices, and the local side effects (cart cleared, change broadcast,
//! purchase flag raised) can all be asserted without a server.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rust_decimal_macros::dec;

use mercato_core::{CustomerId, OrderId, PaymentMethod, PaymentStatus, Price, ProductId};
use mercato_storefront::backend::{
    BackendError, DeliveryAddress, NewOrder, NewOrderItem, NewTransaction, Order,
};
use mercato_storefront::cart::{CartLine, CartStore, InProcessBus, MemoryStorage};
use mercato_storefront::services::{CheckoutError, OrderSubmitter, OrdersApi, SubmitState};

// ============================================================================
// Recording backend double
// ============================================================================

#[derive(Default)]
struct Recorded {
    order: Option<NewOrder>,
    items: Vec<NewOrderItem>,
    transaction: Option<NewTransaction>,
}

struct FakeBackend {
    address: Option<DeliveryAddress>,
    fail_order: bool,
    fail_items: bool,
    recorded: Mutex<Recorded>,
}

impl FakeBackend {
    fn with_address() -> Arc<Self> {
        Arc::new(Self {
            address: Some(DeliveryAddress {
                address: "12 Market St".to_owned(),
                city: Some("Lagos".to_owned()),
                postal_code: Some("100001".to_owned()),
            }),
            fail_order: false,
            fail_items: false,
            recorded: Mutex::new(Recorded::default()),
        })
    }

    fn rejected(table: &str) -> BackendError {
        BackendError::RemoteWrite {
            table: table.to_owned(),
            status: 403,
            body: "row-level security".to_owned(),
        }
    }
}

impl OrdersApi for &FakeBackend {
    async fn delivery_address(
        &self,
        _customer: &CustomerId,
    ) -> Result<Option<DeliveryAddress>, BackendError> {
        Ok(self.address.clone())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        if self.fail_order {
            return Err(FakeBackend::rejected("orders"));
        }
        self.recorded.lock().unwrap().order = Some(order.clone());
        Ok(Order {
            id: OrderId::new("order-77"),
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

    async fn create_order_items(&self, items: &[NewOrderItem]) -> Result<(), BackendError> {
        if self.fail_items {
            return Err(FakeBackend::rejected("order_items"));
        }
        self.recorded.lock().unwrap().items = items.to_vec();
        Ok(())
    }

    async fn record_transaction(&self, transaction: &NewTransaction) -> Result<(), BackendError> {
        self.recorded.lock().unwrap().transaction = Some(transaction.clone());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn cart_store() -> CartStore {
    CartStore::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InProcessBus::new()),
    )
}

fn seeded_cart() -> CartStore {
    let store = cart_store();
    store
        .add_or_toggle(CartLine::new(
            ProductId::new("p1"),
            "Olive oil",
            Price::new(dec!(10)),
            "",
            2,
        ))
        .unwrap();
    store
        .add_or_toggle(CartLine::new(
            ProductId::new("p2"),
            "Honey",
            Price::new(dec!(5)),
            "",
            1,
        ))
        .unwrap();
    store
}

fn customer() -> CustomerId {
    CustomerId::new("c-42")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_submission_freezes_prices_and_totals() {
    let backend = FakeBackend::with_address();
    let store = seeded_cart();
    let submitter = OrderSubmitter::new(&*backend, store.clone());

    let order = submitter
        .submit(Some(&customer()), PaymentMethod::CashOnDelivery)
        .await
        .unwrap()
        .expect("preconditions held");

    assert_eq!(order.total_amount.amount(), dec!(25));
    assert_eq!(submitter.state(), SubmitState::Succeeded);

    let recorded = backend.recorded.lock().unwrap();
    let new_order = recorded.order.as_ref().unwrap();
    assert_eq!(new_order.delivery_address, "12 Market St");
    assert_eq!(new_order.total_amount.amount(), dec!(25));

    // Items carry the price at submission time, per line.
    assert_eq!(recorded.items.len(), 2);
    let oil = recorded
        .items
        .iter()
        .find(|i| i.product_id.as_str() == "p1")
        .unwrap();
    assert_eq!(oil.quantity, 2);
    assert_eq!(oil.price_at_purchase.amount(), dec!(10));
    assert!(recorded.items.iter().all(|i| i.order_id == order.id));

    let transaction = recorded.transaction.as_ref().unwrap();
    assert_eq!(transaction.amount.amount(), dec!(25));
    assert_eq!(transaction.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_success_clears_the_cart_and_notifies_screens() {
    let backend = FakeBackend::with_address();
    let store = seeded_cart();

    let notified = Arc::new(AtomicUsize::new(0));
    let _sub = {
        let notified = notified.clone();
        store.subscribe(move || {
            notified.fetch_add(1, Ordering::SeqCst);
        })
    };

    let submitter = OrderSubmitter::new(&*backend, store.clone());
    submitter
        .submit(Some(&customer()), PaymentMethod::Card)
        .await
        .unwrap();

    assert!(store.load().is_empty());
    // Exactly one broadcast for the clear.
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(store.take_purchase_flag());
    assert!(!store.take_purchase_flag());
}

#[tokio::test]
async fn test_order_rejection_leaves_the_cart_for_retry() {
    let mut backend = FakeBackend::with_address();
    Arc::get_mut(&mut backend).unwrap().fail_order = true;
    let store = seeded_cart();
    let submitter = OrderSubmitter::new(&*backend, store.clone());

    let err = submitter
        .submit(Some(&customer()), PaymentMethod::Card)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderCreateFailed { .. }));
    assert_eq!(submitter.state(), SubmitState::Failed);
    assert_eq!(store.load().len(), 2);
    assert!(!store.take_purchase_flag());
    assert!(backend.recorded.lock().unwrap().items.is_empty());
}

#[tokio::test]
async fn test_items_rejection_names_the_orphaned_order() {
    let mut backend = FakeBackend::with_address();
    Arc::get_mut(&mut backend).unwrap().fail_items = true;
    let store = seeded_cart();
    let submitter = OrderSubmitter::new(&*backend, store.clone());

    let err = submitter
        .submit(Some(&customer()), PaymentMethod::CashOnDelivery)
        .await
        .unwrap_err();

    // The order row exists remotely; the error carries its id so the
    // failure is reconcilable.
    match err {
        CheckoutError::ItemsInsertFailed { order_id, .. } => {
            assert_eq!(order_id.as_str(), "order-77");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.load().len(), 2);
}

#[tokio::test]
async fn test_submitter_is_reusable_after_a_failure() {
    let mut backend = FakeBackend::with_address();
    Arc::get_mut(&mut backend).unwrap().fail_order = true;
    let store = seeded_cart();

    {
        let submitter = OrderSubmitter::new(&*backend, store.clone());
        submitter
            .submit(Some(&customer()), PaymentMethod::Card)
            .await
            .unwrap_err();
        assert_eq!(submitter.state(), SubmitState::Failed);
    }

    let retry_backend = FakeBackend::with_address();
    let submitter = OrderSubmitter::new(&*retry_backend, store.clone());
    let order = submitter
        .submit(Some(&customer()), PaymentMethod::Card)
        .await
        .unwrap();

    assert!(order.is_some());
    assert!(store.load().is_empty());
}
