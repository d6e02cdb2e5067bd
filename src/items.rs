//! Items
//!
//! [`AddItemRequest`] is the only shape the cart accepts. Catalogue types implement
//! [`Purchasable`], vouchers and existing line items convert directly, and the
//! request is turned into a persisted [`LineItem`] by the store.

use rust_decimal::Decimal;

use crate::{
    identity::Owner,
    store::{CartId, ItemId, OrderId},
    vouchers::Voucher,
};

/// What a line item stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Regular purchasable product
    Product,

    /// Discount voucher; its unit price is the signed discount
    Voucher(Voucher),
}

/// Reference back to the catalogue object a line item was created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemReference {
    /// Catalogue type, e.g. `product` or `voucher`
    pub kind: String,

    /// Identifier within that type
    pub id: String,
}

impl ItemReference {
    /// Create a new reference.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Anything that can be put in a cart.
pub trait Purchasable {
    /// Stock keeping unit
    fn sku(&self) -> &str;

    /// Unit price
    fn price(&self) -> Decimal;

    /// Per-unit tax
    fn tax(&self) -> Decimal {
        Decimal::ZERO
    }

    /// Shipping contribution
    fn shipping(&self) -> Decimal {
        Decimal::ZERO
    }

    /// Whether the item may currently be added to a cart
    fn is_shoppable(&self) -> bool {
        true
    }

    /// Catalogue reference stored alongside the line item
    fn reference(&self) -> Option<ItemReference> {
        None
    }
}

/// Normalized request to add something to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemRequest {
    /// Stock keeping unit
    pub sku: String,

    /// Unit price captured at add time
    pub price: Decimal,

    /// Per-unit tax captured at add time
    pub tax: Decimal,

    /// Shipping captured at add time
    pub shipping: Decimal,

    /// Non-shoppable requests are ignored by the cart
    pub shoppable: bool,

    /// Catalogue reference
    pub reference: Option<ItemReference>,

    /// Product or voucher
    pub kind: ItemKind,
}

impl AddItemRequest {
    /// Create a shoppable product request with no tax or shipping.
    pub fn new(sku: impl Into<String>, price: Decimal) -> Self {
        Self {
            sku: sku.into(),
            price,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            shoppable: true,
            reference: None,
            kind: ItemKind::Product,
        }
    }

    /// Set the per-unit tax.
    #[must_use]
    pub fn with_tax(mut self, tax: Decimal) -> Self {
        self.tax = tax;
        self
    }

    /// Set the shipping contribution.
    #[must_use]
    pub fn with_shipping(mut self, shipping: Decimal) -> Self {
        self.shipping = shipping;
        self
    }

    /// Mark the request as shoppable or not.
    #[must_use]
    pub fn with_shoppable(mut self, shoppable: bool) -> Self {
        self.shoppable = shoppable;
        self
    }

    /// Build a request from a catalogue item.
    pub fn from_purchasable<P: Purchasable + ?Sized>(item: &P) -> Self {
        Self {
            sku: item.sku().to_string(),
            price: item.price(),
            tax: item.tax(),
            shipping: item.shipping(),
            shoppable: item.is_shoppable(),
            reference: item.reference(),
            kind: ItemKind::Product,
        }
    }
}

impl From<&Voucher> for AddItemRequest {
    fn from(voucher: &Voucher) -> Self {
        Self {
            sku: voucher.sku.clone(),
            price: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            shoppable: true,
            reference: Some(ItemReference::new("voucher", voucher.sku.clone())),
            kind: ItemKind::Voucher(voucher.clone()),
        }
    }
}

impl From<&LineItem> for AddItemRequest {
    fn from(item: &LineItem) -> Self {
        Self {
            sku: item.sku.clone(),
            price: item.unit_price,
            tax: item.tax,
            shipping: item.shipping,
            shoppable: true,
            reference: item.reference.clone(),
            kind: item.kind.clone(),
        }
    }
}

/// A persisted cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Store-assigned identifier
    pub id: ItemId,

    /// Owning cart; cleared once the item moves to an order
    pub cart_id: Option<CartId>,

    /// Order the item was placed with
    pub order_id: Option<OrderId>,

    /// Owner captured at add time
    pub owner: Owner,

    /// Stock keeping unit
    pub sku: String,

    /// Quantity in the cart
    pub quantity: u32,

    /// Unit price; for vouchers the signed discount
    pub unit_price: Decimal,

    /// Per-unit tax
    pub tax: Decimal,

    /// Shipping contribution
    pub shipping: Decimal,

    /// ISO currency code captured at add time
    pub currency: String,

    /// Catalogue reference
    pub reference: Option<ItemReference>,

    /// Product or voucher
    pub kind: ItemKind,
}

impl LineItem {
    /// Whether this line is a voucher.
    pub fn is_voucher(&self) -> bool {
        matches!(self.kind, ItemKind::Voucher(_))
    }

    /// The voucher rules, for voucher lines.
    pub fn voucher(&self) -> Option<&Voucher> {
        match &self.kind {
            ItemKind::Voucher(voucher) => Some(voucher),
            ItemKind::Product => None,
        }
    }

    /// Unit price multiplied by quantity.
    pub fn line_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A line item that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    /// Owning cart
    pub cart_id: CartId,

    /// Owner captured at add time
    pub owner: Owner,

    /// Stock keeping unit
    pub sku: String,

    /// Quantity in the cart
    pub quantity: u32,

    /// Unit price
    pub unit_price: Decimal,

    /// Per-unit tax
    pub tax: Decimal,

    /// Shipping contribution
    pub shipping: Decimal,

    /// ISO currency code
    pub currency: String,

    /// Catalogue reference
    pub reference: Option<ItemReference>,

    /// Product or voucher
    pub kind: ItemKind,
}

impl NewLineItem {
    /// Snapshot a request into a new line for the given cart.
    pub fn from_request(
        cart_id: CartId,
        owner: Owner,
        request: AddItemRequest,
        quantity: u32,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            cart_id,
            owner,
            sku: request.sku,
            quantity,
            unit_price: request.price,
            tax: request.tax,
            shipping: request.shipping,
            currency: currency.into(),
            reference: request.reference,
            kind: request.kind,
        }
    }

    /// Attach the store-assigned identifier.
    pub fn into_line_item(self, id: ItemId) -> LineItem {
        LineItem {
            id,
            cart_id: Some(self.cart_id),
            order_id: None,
            owner: self.owner,
            sku: self.sku,
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax: self.tax,
            shipping: self.shipping,
            currency: self.currency,
            reference: self.reference,
            kind: self.kind,
        }
    }
}
