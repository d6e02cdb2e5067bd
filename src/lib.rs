//! Shopfront
//!
//! Shopfront is a shopping cart engine: carts owned by users or anonymous
//! sessions, quantity-tracked line items, a single active voucher per cart,
//! cached totals and checkout into orders.

pub mod cache;
pub mod carts;
pub mod config;
pub mod display;
pub mod identity;
pub mod items;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod store;
pub mod vouchers;
