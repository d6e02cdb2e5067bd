//! Pricing

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{config::ShopConfig, items::LineItem};

/// How cart tax is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxPolicy {
    /// Tax is charged on the last product line only.
    ///
    /// This is how carts have always been taxed, so it stays the default even
    /// though it under-charges carts with more than one product line.
    #[default]
    LastItem,

    /// Tax is summed over every product line, preferring the per-unit tax
    /// captured on the line and falling back to the configured rate.
    PerItem,
}

/// Aggregate view of a cart.
///
/// Amounts are kept at full precision; the accessors round to two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    item_count: u64,
    total_price: Decimal,
    total_tax: Decimal,
    total_shipping: Decimal,
    total_discount: Decimal,
}

impl Totals {
    /// Number of product units in the cart, vouchers excluded.
    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Sum of product line prices.
    pub fn total_price(&self) -> Decimal {
        round_money(self.total_price)
    }

    /// Tax owed.
    pub fn total_tax(&self) -> Decimal {
        round_money(self.total_tax)
    }

    /// Shipping, either summed per item or the cart override.
    pub fn total_shipping(&self) -> Decimal {
        round_money(self.total_shipping)
    }

    /// Sum of voucher contributions; zero or negative.
    pub fn total_discount(&self) -> Decimal {
        round_money(self.total_discount)
    }

    /// Amount to charge: price, tax, shipping and discount combined.
    pub fn total(&self) -> Decimal {
        self.total_price() + self.total_tax() + self.total_shipping() + self.total_discount()
    }
}

/// Round an amount to two places, midpoints away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes [`Totals`] from a cart's line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingEngine {
    tax_rate: Decimal,
    tax_policy: TaxPolicy,
}

impl PricingEngine {
    /// Create an engine with a fractional tax rate (e.g. `0.2` for 20%).
    pub fn new(tax_rate: Decimal, tax_policy: TaxPolicy) -> Self {
        Self {
            tax_rate,
            tax_policy,
        }
    }

    /// Create an engine from the shop configuration.
    pub fn from_config(config: &ShopConfig) -> Self {
        Self::new(config.tax, config.tax_policy)
    }

    /// Calculate the totals for a cart.
    ///
    /// A non-zero `shipping_override` replaces the per-item shipping sum.
    pub fn calculate(&self, items: &[LineItem], shipping_override: Decimal) -> Totals {
        let mut totals = Totals::default();

        for item in items {
            if item.is_voucher() {
                totals.total_discount += item.unit_price.min(Decimal::ZERO);
            } else {
                totals.item_count += u64::from(item.quantity);
                totals.total_price += item.line_price();
                totals.total_shipping += item.shipping;
            }
        }

        totals.total_tax = self.total_tax(items);

        if !shipping_override.is_zero() {
            totals.total_shipping = shipping_override;
        }

        totals
    }

    /// The amount vouchers are evaluated against: product price plus tax,
    /// ignoring every voucher line.
    pub fn qualifying_subtotal(&self, items: &[LineItem]) -> Decimal {
        let price: Decimal = items
            .iter()
            .filter(|item| !item.is_voucher())
            .map(LineItem::line_price)
            .sum();

        price + self.total_tax(items)
    }

    fn total_tax(&self, items: &[LineItem]) -> Decimal {
        let mut products = items.iter().filter(|item| !item.is_voucher());

        match self.tax_policy {
            TaxPolicy::LastItem => products
                .next_back()
                .map_or(Decimal::ZERO, |item| self.tax_on(item.line_price())),
            TaxPolicy::PerItem => products
                .map(|item| {
                    if item.tax.is_zero() {
                        self.tax_on(item.line_price())
                    } else {
                        item.tax * Decimal::from(item.quantity)
                    }
                })
                .sum(),
        }
    }

    fn tax_on(&self, amount: Decimal) -> Decimal {
        round_money(Percentage::from(self.tax_rate) * amount)
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use crate::{
        identity::{Owner, UserId},
        items::{AddItemRequest, ItemKind, NewLineItem},
        store::{CartId, ItemId},
        vouchers::Voucher,
    };

    use super::*;

    fn product(sku: &str, price: Decimal, quantity: u32, shipping: Decimal) -> LineItem {
        NewLineItem::from_request(
            CartId(1),
            Owner::User(UserId(1)),
            AddItemRequest::new(sku, price).with_shipping(shipping),
            quantity,
            "USD",
        )
        .into_line_item(ItemId(1))
    }

    fn voucher(discount: Decimal) -> LineItem {
        let rules = Voucher::fixed("V", Decimal::from(5), Decimal::ZERO, Timestamp::UNIX_EPOCH);
        let mut item = product("V", discount, 1, Decimal::ZERO);

        item.kind = ItemKind::Voucher(rules);
        item
    }

    fn scenario_items() -> Vec<LineItem> {
        vec![
            product("A", Decimal::from(10), 2, Decimal::ONE),
            product("B", Decimal::from(5), 1, Decimal::new(5, 1)),
        ]
    }

    fn engine(policy: TaxPolicy) -> PricingEngine {
        PricingEngine::new(Decimal::new(1, 1), policy)
    }

    #[test]
    fn empty_cart_is_all_zero() {
        let totals = engine(TaxPolicy::LastItem).calculate(&[], Decimal::ZERO);

        assert_eq!(totals, Totals::default());
        assert_eq!(totals.total(), Decimal::ZERO);
    }

    #[test]
    fn last_item_tax_policy() {
        let totals = engine(TaxPolicy::LastItem).calculate(&scenario_items(), Decimal::ZERO);

        assert_eq!(totals.item_count(), 3);
        assert_eq!(totals.total_price(), Decimal::from(25));
        assert_eq!(totals.total_shipping(), Decimal::new(15, 1));
        assert_eq!(totals.total_tax(), Decimal::new(5, 1));
        assert_eq!(totals.total_discount(), Decimal::ZERO);
        assert_eq!(totals.total(), Decimal::from(27));
    }

    #[test]
    fn per_item_tax_policy() {
        let totals = engine(TaxPolicy::PerItem).calculate(&scenario_items(), Decimal::ZERO);

        assert_eq!(totals.total_tax(), Decimal::new(25, 1));
    }

    #[test]
    fn per_item_tax_prefers_captured_tax() {
        let mut items = scenario_items();

        if let Some(first) = items.first_mut() {
            first.tax = Decimal::new(3, 1);
        }

        let totals = engine(TaxPolicy::PerItem).calculate(&items, Decimal::ZERO);

        // 0.3 * 2 for A, 5 * 0.1 for B
        assert_eq!(totals.total_tax(), Decimal::new(11, 1));
    }

    #[test]
    fn last_item_tax_skips_trailing_vouchers() {
        let mut items = scenario_items();
        items.push(voucher(Decimal::from(-2)));

        let totals = engine(TaxPolicy::LastItem).calculate(&items, Decimal::ZERO);

        assert_eq!(totals.total_tax(), Decimal::new(5, 1));
    }

    #[test]
    fn vouchers_only_count_towards_discount() {
        let mut items = scenario_items();
        items.push(voucher(Decimal::new(-25, 1)));

        let totals = engine(TaxPolicy::LastItem).calculate(&items, Decimal::ZERO);

        assert_eq!(totals.item_count(), 3);
        assert_eq!(totals.total_price(), Decimal::from(25));
        assert_eq!(totals.total_shipping(), Decimal::new(15, 1));
        assert_eq!(totals.total_discount(), Decimal::new(-25, 1));
        assert_eq!(totals.total(), Decimal::new(245, 1));
    }

    #[test]
    fn positive_voucher_prices_never_increase_the_total() {
        let items = vec![voucher(Decimal::from(3))];

        let totals = engine(TaxPolicy::LastItem).calculate(&items, Decimal::ZERO);

        assert_eq!(totals.total_discount(), Decimal::ZERO);
    }

    #[test]
    fn shipping_override_replaces_item_shipping() {
        let totals = engine(TaxPolicy::LastItem).calculate(&scenario_items(), Decimal::from(7));

        assert_eq!(totals.total_shipping(), Decimal::from(7));
    }

    #[test]
    fn accessors_round_but_totals_keep_precision() {
        let items = vec![product("A", Decimal::new(3333, 3), 1, Decimal::ZERO)];

        let totals = engine(TaxPolicy::LastItem).calculate(&items, Decimal::ZERO);

        assert_eq!(totals.total_price(), Decimal::new(333, 2));
        assert_eq!(totals.total_price, Decimal::new(3333, 3));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
    }

    #[test]
    fn qualifying_subtotal_ignores_vouchers() {
        let mut items = scenario_items();
        items.push(voucher(Decimal::from(-10)));

        let subtotal = engine(TaxPolicy::LastItem).qualifying_subtotal(&items);

        assert_eq!(subtotal, Decimal::new(255, 1));
    }
}
