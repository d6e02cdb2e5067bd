//! Display
//!
//! Currency formatting for cart amounts and a printable cart summary.

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    items::LineItem,
    pricing::{Totals, round_money},
};

/// Errors that can occur while writing a summary.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// IO error
    #[error("IO error")]
    Io(#[from] io::Error),
}

/// Format an amount in the given currency, rounded to two places.
pub fn format_amount(amount: Decimal, currency: &'static Currency) -> String {
    Money::from_decimal(round_money(amount), currency).to_string()
}

/// Every totals figure formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTotals {
    /// Product total
    pub total_price: String,

    /// Tax total
    pub total_tax: String,

    /// Shipping total
    pub total_shipping: String,

    /// Voucher total
    pub total_discount: String,

    /// Amount to charge
    pub total: String,
}

impl DisplayTotals {
    /// Format totals in the given currency.
    pub fn new(totals: &Totals, currency: &'static Currency) -> Self {
        Self {
            total_price: format_amount(totals.total_price(), currency),
            total_tax: format_amount(totals.total_tax(), currency),
            total_shipping: format_amount(totals.total_shipping(), currency),
            total_discount: format_amount(totals.total_discount(), currency),
            total: format_amount(totals.total(), currency),
        }
    }
}

/// Write the cart lines as a table followed by the totals.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_summary(
    mut out: impl io::Write,
    items: &[LineItem],
    totals: &Totals,
    currency: &'static Currency,
) -> Result<(), DisplayError> {
    let mut builder = Builder::default();

    builder.push_record(["SKU", "Qty", "Unit Price", "Line Total"]);

    for item in items {
        let line_total = if item.is_voucher() {
            item.unit_price
        } else {
            item.line_price()
        };

        builder.push_record([
            item.sku.clone(),
            item.quantity.to_string(),
            format_amount(item.unit_price, currency),
            format_amount(line_total, currency),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(1..4), Alignment::right());
    table.modify(Rows::first(), Alignment::center());

    writeln!(out, "{table}")?;

    let display = DisplayTotals::new(totals, currency);

    let lines = [
        ("Subtotal:", &display.total_price),
        ("Tax:", &display.total_tax),
        ("Shipping:", &display.total_shipping),
        ("Discount:", &display.total_discount),
        ("Total:", &display.total),
    ];

    let value_width = lines
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or(0);

    for (label, value) in lines {
        writeln!(out, " {label:<10}{value:>value_width$}")?;
    }

    Ok(())
}
