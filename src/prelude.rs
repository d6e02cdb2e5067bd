//! Shopfront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cache::{CacheError, CacheKey, CalculationCache, MemoryCache},
    carts::{Cart, CartError, CartService},
    config::{ConfigError, ShopConfig},
    display::{DisplayError, DisplayTotals, format_amount, write_summary},
    identity::{
        GuestResolver, IdentityResolver, Owner, SessionContext, SessionId, UserId, resolve_owner,
    },
    items::{AddItemRequest, ItemKind, ItemReference, LineItem, NewLineItem, Purchasable},
    orders::{NewOrder, Order},
    pricing::{PricingEngine, TaxPolicy, Totals, round_money},
    store::{CartId, CartRecord, CartStore, ItemId, MemoryStore, OrderId, StoreError},
    vouchers::Voucher,
};
