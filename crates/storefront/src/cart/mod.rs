//! The device-local shopping cart.
//!
//! The cart is the one piece of state shared across independently-mounted
//! screens (header badge, cart screen, product detail), so it gets the full
//! treatment: pure state operations here, durable storage in
//! [`storage`], a write-through store in [`store`], and a cross-screen
//! change signal in [`broadcast`].

pub mod broadcast;
pub mod storage;
pub mod store;

pub use broadcast::{Broadcaster, InProcessBus, Subscription};
pub use storage::{CartStorage, FileStorage, MemoryStorage, PersistenceError};
pub use store::CartStore;

use serde::{Deserialize, Serialize};

use mercato_core::{Price, ProductId};

use crate::backend::Product;

/// One line of the cart.
///
/// `quantity` is always at least 1; a line whose quantity would reach 0 is
/// removed from the cart rather than kept around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line, clamping the quantity to at least 1.
    #[must_use]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Price,
        image_url: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image_url: image_url.into(),
            quantity: quantity.max(1),
        }
    }

    /// Whether two lines refer to the same product.
    ///
    /// Matching `id` is the identity rule; matching `name` and `price`
    /// together is a secondary duplicate check for catalog rows that
    /// occasionally reappear under fresh ids.
    #[must_use]
    pub fn is_same_product(&self, other: &Self) -> bool {
        self.id == other.id || (self.name == other.name && self.price == other.price)
    }

    /// Line total (`price` × `quantity`).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

impl From<&Product> for CartLine {
    fn from(product: &Product) -> Self {
        Self::new(
            product.id.clone(),
            product.name.clone(),
            product.price,
            product.image_url.clone().unwrap_or_default(),
            1,
        )
    }
}

/// An ordered sequence of cart lines.
///
/// Invariant: no two lines satisfy [`CartLine::is_same_product`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines (the header badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Add a line, or remove the existing duplicate.
    ///
    /// The "add to cart" button doubles as "remove from cart": when a line
    /// for the same product is already present, that line is removed
    /// instead of having its quantity bumped. The quantity stepper path is
    /// [`Self::change_quantity`].
    ///
    /// Returns `true` when the line is now in the cart.
    pub fn add_or_toggle(&mut self, line: CartLine) -> bool {
        let before = self.lines.len();
        self.lines.retain(|existing| !existing.is_same_product(&line));

        if self.lines.len() < before {
            false
        } else {
            self.lines.push(line);
            true
        }
    }

    /// Adjust a line's quantity by `delta`.
    ///
    /// A resulting quantity of 0 or less drops the line. An `id` that
    /// matches no line is a no-op.
    pub fn change_quantity(&mut self, id: &ProductId, delta: i64) {
        let Some(index) = self.lines.iter().position(|line| &line.id == id) else {
            return;
        };

        let current = self.lines.get(index).map_or(0, |line| i64::from(line.quantity));
        let new_quantity = current + delta;
        if new_quantity <= 0 {
            self.lines.remove(index);
        } else if let Some(line) = self.lines.get_mut(index) {
            line.quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);
        }
    }

    /// Remove the line with the given id.
    pub fn remove(&mut self, id: &ProductId) {
        self.lines.retain(|line| &line.id != id);
    }

    /// Drop all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
