//! Vouchers
//!
//! A voucher sits in the cart as a line item whose price is the signed discount
//! it currently grants. That price is recomputed from the voucher's rules every
//! time the cart changes.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Voucher rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher code
    pub sku: String,

    /// Qualifying subtotal required before the voucher applies
    #[serde(default)]
    pub minimum_price: Decimal,

    /// Percentage off the qualifying subtotal, in percent points (0-100)
    #[serde(default)]
    pub percentage_adjustment: Decimal,

    /// Fixed amount off, used when no percentage is set
    #[serde(default)]
    pub fixed_price_adjustment: Decimal,

    /// Vouchers cannot be added to a cart from this instant on
    pub expiry: Timestamp,
}

impl Voucher {
    /// Create a percentage voucher.
    pub fn percentage(
        sku: impl Into<String>,
        percentage: Decimal,
        minimum_price: Decimal,
        expiry: Timestamp,
    ) -> Self {
        Self {
            sku: sku.into(),
            minimum_price,
            percentage_adjustment: percentage,
            fixed_price_adjustment: Decimal::ZERO,
            expiry,
        }
    }

    /// Create a fixed amount voucher.
    pub fn fixed(
        sku: impl Into<String>,
        amount: Decimal,
        minimum_price: Decimal,
        expiry: Timestamp,
    ) -> Self {
        Self {
            sku: sku.into(),
            minimum_price,
            percentage_adjustment: Decimal::ZERO,
            fixed_price_adjustment: amount,
            expiry,
        }
    }

    /// Whether the voucher has expired at the given instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiry <= now
    }

    /// Compute the discount this voucher grants for the given qualifying subtotal.
    pub fn evaluate(&self, qualifying_subtotal: Decimal) -> Decimal {
        evaluate(self, qualifying_subtotal)
    }
}

/// Compute a voucher's signed contribution to the cart.
///
/// The result is never positive:
///
/// - below `minimum_price` the voucher does not apply (zero);
/// - a percentage adjustment takes that share of the qualifying subtotal;
/// - otherwise a fixed adjustment is taken, capped at the qualifying subtotal.
pub fn evaluate(voucher: &Voucher, qualifying_subtotal: Decimal) -> Decimal {
    if qualifying_subtotal < voucher.minimum_price || qualifying_subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    if voucher.percentage_adjustment > Decimal::ZERO {
        let points = voucher.percentage_adjustment.min(Decimal::ONE_HUNDRED);
        let percentage = Percentage::from(points / Decimal::ONE_HUNDRED);

        return negate(percentage * qualifying_subtotal);
    }

    if voucher.fixed_price_adjustment > Decimal::ZERO {
        return negate(voucher.fixed_price_adjustment.min(qualifying_subtotal));
    }

    Decimal::ZERO
}

fn negate(amount: Decimal) -> Decimal {
    if amount.is_zero() {
        Decimal::ZERO
    } else {
        -amount
    }
}
