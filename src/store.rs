//! Store
//!
//! Persistence for carts, their line items and the orders they become.
//! [`MemoryStore`] keeps everything in process; hosts with a database implement
//! [`CartStore`] over it instead.

use std::{collections::BTreeMap, fmt};

use mockall::automock;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    identity::Owner,
    items::{LineItem, NewLineItem},
    orders::{NewOrder, Order},
};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Cart identifier
    CartId
);

record_id!(
    /// Line item identifier
    ItemId
);

record_id!(
    /// Order identifier
    OrderId
);

/// Errors raised by a [`CartStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cart does not exist.
    #[error("cart {0} not found")]
    CartNotFound(CartId),

    /// The line item does not exist.
    #[error("line item {0} not found")]
    ItemNotFound(ItemId),

    /// The storage backend failed.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A persisted cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecord {
    /// Store-assigned identifier
    pub id: CartId,

    /// Who the cart belongs to
    pub owner: Owner,

    /// Fixed shipping amount; zero means per-item shipping applies
    pub shipping: Decimal,
}

/// Persistence for carts, line items and orders.
#[automock]
pub trait CartStore {
    /// Create an empty cart for the owner.
    fn create_cart(&mut self, owner: Owner) -> Result<CartRecord, StoreError>;

    /// Find the owner's cart.
    fn find_cart(&self, owner: &Owner) -> Result<Option<CartRecord>, StoreError>;

    /// Load a cart by identifier.
    fn get_cart(&self, cart: CartId) -> Result<Option<CartRecord>, StoreError>;

    /// Persist the cart's shipping override.
    fn set_cart_shipping(&mut self, cart: CartId, shipping: Decimal) -> Result<(), StoreError>;

    /// All line items of a cart, in insertion order.
    fn cart_items(&self, cart: CartId) -> Result<Vec<LineItem>, StoreError>;

    /// The cart's line item for a SKU.
    fn find_item(&self, cart: CartId, sku: &str) -> Result<Option<LineItem>, StoreError>;

    /// Persist a new line item.
    fn insert_item(&mut self, item: NewLineItem) -> Result<LineItem, StoreError>;

    /// Overwrite an existing line item.
    fn update_item(&mut self, item: &LineItem) -> Result<(), StoreError>;

    /// Delete a line item.
    fn delete_item(&mut self, item: ItemId) -> Result<(), StoreError>;

    /// Delete every line item of a cart, returning how many were removed.
    fn delete_cart_items(&mut self, cart: CartId) -> Result<u64, StoreError>;

    /// Persist a new order.
    fn create_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    /// Re-parent every line item of a cart onto an order, returning how many moved.
    fn move_items_to_order(&mut self, cart: CartId, order: OrderId) -> Result<u64, StoreError>;

    /// All line items placed with an order.
    fn order_items(&self, order: OrderId) -> Result<Vec<LineItem>, StoreError>;
}

/// In-process [`CartStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    carts: FxHashMap<CartId, CartRecord>,
    items: BTreeMap<ItemId, LineItem>,
    orders: FxHashMap<OrderId, Order>,
    last_id: u64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a placed order.
    pub fn order(&self, order: OrderId) -> Option<&Order> {
        self.orders.get(&order)
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

impl CartStore for MemoryStore {
    fn create_cart(&mut self, owner: Owner) -> Result<CartRecord, StoreError> {
        let cart = CartRecord {
            id: CartId(self.next_id()),
            owner,
            shipping: Decimal::ZERO,
        };

        self.carts.insert(cart.id, cart.clone());

        Ok(cart)
    }

    fn find_cart(&self, owner: &Owner) -> Result<Option<CartRecord>, StoreError> {
        Ok(self
            .carts
            .values()
            .filter(|cart| &cart.owner == owner)
            .min_by_key(|cart| cart.id)
            .cloned())
    }

    fn get_cart(&self, cart: CartId) -> Result<Option<CartRecord>, StoreError> {
        Ok(self.carts.get(&cart).cloned())
    }

    fn set_cart_shipping(&mut self, cart: CartId, shipping: Decimal) -> Result<(), StoreError> {
        let record = self
            .carts
            .get_mut(&cart)
            .ok_or(StoreError::CartNotFound(cart))?;

        record.shipping = shipping;

        Ok(())
    }

    fn cart_items(&self, cart: CartId) -> Result<Vec<LineItem>, StoreError> {
        Ok(self
            .items
            .values()
            .filter(|item| item.cart_id == Some(cart))
            .cloned()
            .collect())
    }

    fn find_item(&self, cart: CartId, sku: &str) -> Result<Option<LineItem>, StoreError> {
        Ok(self
            .items
            .values()
            .find(|item| item.cart_id == Some(cart) && item.sku == sku)
            .cloned())
    }

    fn insert_item(&mut self, item: NewLineItem) -> Result<LineItem, StoreError> {
        if !self.carts.contains_key(&item.cart_id) {
            return Err(StoreError::CartNotFound(item.cart_id));
        }

        let item = item.into_line_item(ItemId(self.next_id()));

        self.items.insert(item.id, item.clone());

        Ok(item)
    }

    fn update_item(&mut self, item: &LineItem) -> Result<(), StoreError> {
        let stored = self
            .items
            .get_mut(&item.id)
            .ok_or(StoreError::ItemNotFound(item.id))?;

        stored.clone_from(item);

        Ok(())
    }

    fn delete_item(&mut self, item: ItemId) -> Result<(), StoreError> {
        self.items
            .remove(&item)
            .map(|_removed| ())
            .ok_or(StoreError::ItemNotFound(item))
    }

    fn delete_cart_items(&mut self, cart: CartId) -> Result<u64, StoreError> {
        let mut removed = 0;

        self.items.retain(|_, item| {
            let keep = item.cart_id != Some(cart);

            if !keep {
                removed += 1;
            }

            keep
        });

        Ok(removed)
    }

    fn create_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let order = order.into_order(OrderId(self.next_id()));

        self.orders.insert(order.id, order.clone());

        Ok(order)
    }

    fn move_items_to_order(&mut self, cart: CartId, order: OrderId) -> Result<u64, StoreError> {
        let mut moved = 0;

        for item in self
            .items
            .values_mut()
            .filter(|item| item.cart_id == Some(cart))
        {
            item.cart_id = None;
            item.order_id = Some(order);
            moved += 1;
        }

        Ok(moved)
    }

    fn order_items(&self, order: OrderId) -> Result<Vec<LineItem>, StoreError> {
        Ok(self
            .items
            .values()
            .filter(|item| item.order_id == Some(order))
            .cloned()
            .collect())
    }
}
