//! Orders

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::{identity::UserId, pricing::Totals, store::OrderId};

/// An order created from a cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Store-assigned identifier
    pub id: OrderId,

    /// Ordering user; `None` for guest checkouts
    pub user_id: Option<UserId>,

    /// Status code the order was placed with
    pub status_code: String,

    /// Product total
    pub price: Decimal,

    /// Tax total
    pub tax: Decimal,

    /// Shipping total
    pub shipping: Decimal,

    /// Voucher total; zero or negative
    pub discount: Decimal,

    /// Amount charged
    pub total_price: Decimal,

    /// When the order was placed
    pub placed_at: Timestamp,
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Ordering user
    pub user_id: Option<UserId>,

    /// Status code
    pub status_code: String,

    /// Product total
    pub price: Decimal,

    /// Tax total
    pub tax: Decimal,

    /// Shipping total
    pub shipping: Decimal,

    /// Voucher total
    pub discount: Decimal,

    /// Amount charged
    pub total_price: Decimal,

    /// When the order was placed
    pub placed_at: Timestamp,
}

impl NewOrder {
    /// Snapshot the rounded cart totals.
    pub fn from_totals(
        user_id: Option<UserId>,
        status_code: impl Into<String>,
        totals: &Totals,
        placed_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            status_code: status_code.into(),
            price: totals.total_price(),
            tax: totals.total_tax(),
            shipping: totals.total_shipping(),
            discount: totals.total_discount(),
            total_price: totals.total(),
            placed_at,
        }
    }

    /// Attach the store-assigned identifier.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id,
            status_code: self.status_code,
            price: self.price,
            tax: self.tax,
            shipping: self.shipping,
            discount: self.discount,
            total_price: self.total_price,
            placed_at: self.placed_at,
        }
    }
}
