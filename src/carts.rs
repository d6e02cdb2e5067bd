//! Carts
//!
//! [`CartService`] owns the cart workflow: adding and removing lines, voucher
//! re-evaluation, shipping overrides, merging and checkout. Every mutation
//! re-prices active vouchers and drops the cart's cached calculations.
//!
//! Requests that make no sense for the cart (non-shoppable items, expired
//! vouchers, unknown SKUs) are not errors; the operation reports `false` and
//! leaves the cart as it was. Store and cache failures propagate unchanged.

use jiff::Timestamp;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{Span, debug, info};

use crate::{
    cache::{CacheError, CacheKey, CalculationCache},
    config::ShopConfig,
    identity::{IdentityResolver, Owner, SessionContext, UserId, resolve_owner},
    items::{AddItemRequest, LineItem, NewLineItem},
    orders::{NewOrder, Order},
    pricing::{PricingEngine, Totals},
    store::{CartId, CartRecord, CartStore, OrderId, StoreError},
    vouchers::Voucher,
};

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The calculation cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Handle on a cart, carrying the last totals read through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    record: CartRecord,
    calculations: Option<Totals>,
}

impl Cart {
    /// Cart identifier
    pub fn id(&self) -> CartId {
        self.record.id
    }

    /// Who the cart belongs to
    pub fn owner(&self) -> &Owner {
        &self.record.owner
    }

    /// Shipping override; zero when per-item shipping applies
    pub fn shipping(&self) -> Decimal {
        self.record.shipping
    }

    /// The underlying record
    pub fn record(&self) -> &CartRecord {
        &self.record
    }

    /// Totals last read through this handle; cleared by its own mutations
    pub fn calculations(&self) -> Option<&Totals> {
        self.calculations.as_ref()
    }
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        Self {
            record,
            calculations: None,
        }
    }
}

/// Cart workflow over a store and a calculation cache.
#[derive(Debug)]
pub struct CartService<S, C> {
    store: S,
    cache: C,
    config: ShopConfig,
    engine: PricingEngine,
}

impl<S: CartStore, C: CalculationCache> CartService<S, C> {
    /// Create a service.
    pub fn new(store: S, cache: C, config: ShopConfig) -> Self {
        let engine = PricingEngine::from_config(&config);

        Self {
            store,
            cache,
            config,
            engine,
        }
    }

    /// Shop configuration
    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The calculation cache
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The cart of whoever is making the request, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[tracing::instrument(name = "carts.current", skip_all, fields(user_id = tracing::field::Empty))]
    pub fn current(
        &mut self,
        session: &mut SessionContext,
        resolver: &dyn IdentityResolver,
    ) -> Result<Cart, CartError> {
        let owner = resolve_owner(resolver, &self.config.user_auth_provider, session);

        if let Some(user) = owner.user_id() {
            Span::current().record("user_id", tracing::field::display(user));
        }

        self.find_or_create(owner)
    }

    /// The anonymous session's cart, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn current_session(&mut self, session: &mut SessionContext) -> Result<Cart, CartError> {
        let owner = Owner::Session(session.session_id().clone());

        self.find_or_create(owner)
    }

    /// A user's cart, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn find_by_user(&mut self, user: UserId) -> Result<Cart, CartError> {
        self.find_or_create(Owner::User(user))
    }

    fn find_or_create(&mut self, owner: Owner) -> Result<Cart, CartError> {
        if let Some(record) = self.store.find_cart(&owner)? {
            return Ok(Cart::from(record));
        }

        let record = self.store.create_cart(owner)?;

        debug!(cart_id = %record.id, "created cart");

        Ok(Cart::from(record))
    }

    /// Every line of the cart, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn items(&self, cart: &Cart) -> Result<Vec<LineItem>, CartError> {
        Ok(self.store.cart_items(cart.id())?)
    }

    /// The voucher lines of the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn voucher_items(&self, cart: &Cart) -> Result<SmallVec<[LineItem; 1]>, CartError> {
        Ok(self
            .store
            .cart_items(cart.id())?
            .into_iter()
            .filter(LineItem::is_voucher)
            .collect())
    }

    /// The cart's totals, read through the calculation cache.
    ///
    /// The cart record is reloaded first so changes made through other handles
    /// on the same cart, including the shipping override, are always seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails, or the cart no longer exists.
    pub fn totals(&self, cart: &mut Cart) -> Result<Totals, CartError> {
        self.refresh(cart)?;

        let key = self.cache_key(cart);

        if self.config.cache_calculations
            && let Some(totals) = self.cache.get(&key)?
        {
            debug!(%key, "calculations cache hit");

            cart.calculations = Some(totals);

            return Ok(totals);
        }

        let totals = self.calculate(cart)?;

        if self.config.cache_calculations {
            self.cache
                .put(&key, totals, self.config.cache_calculations_minutes)?;
        }

        Ok(totals)
    }

    /// Add an item, or more of it, to the cart.
    ///
    /// An existing line for the same SKU has `quantity` added to it, or replaced
    /// by it when `reset_quantity` is set; resetting to zero removes the line.
    /// Returns `false`, leaving the cart untouched, for non-shoppable items and
    /// for zero quantities with nothing to reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(
        name = "carts.add",
        skip_all,
        fields(
            cart_id = %cart.id(),
            quantity = quantity,
            reset_quantity = reset_quantity,
            sku = tracing::field::Empty
        )
    )]
    pub fn add(
        &mut self,
        cart: &mut Cart,
        item: impl Into<AddItemRequest>,
        quantity: u32,
        reset_quantity: bool,
    ) -> Result<bool, CartError> {
        let request = item.into();

        Span::current().record("sku", tracing::field::display(&request.sku));

        if !request.shoppable {
            debug!("item is not shoppable, ignoring");

            return Ok(false);
        }

        if quantity == 0 && !reset_quantity {
            debug!("nothing to add");

            return Ok(false);
        }

        match self.store.find_item(cart.id(), &request.sku)? {
            Some(mut existing) => {
                existing.quantity = if reset_quantity {
                    quantity
                } else {
                    existing.quantity.saturating_add(quantity)
                };

                if existing.quantity == 0 {
                    self.store.delete_item(existing.id)?;
                } else {
                    self.store.update_item(&existing)?;
                }
            }
            None if quantity == 0 => {
                debug!("nothing to reset");

                return Ok(false);
            }
            None => {
                let item = NewLineItem::from_request(
                    cart.id(),
                    cart.owner().clone(),
                    request,
                    quantity,
                    self.config.currency.clone(),
                );

                self.store.insert_item(item)?;
            }
        }

        self.process_vouchers(cart)?;
        self.reset_calculations(cart)?;

        Ok(true)
    }

    /// Apply a voucher, replacing any voucher already in the cart.
    ///
    /// Expired vouchers are ignored and the cart is left as it was, so a voucher
    /// already in the cart stays active.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(name = "carts.add_voucher", skip_all, fields(cart_id = %cart.id(), sku = %voucher.sku))]
    pub fn add_voucher(&mut self, cart: &mut Cart, voucher: &Voucher) -> Result<bool, CartError> {
        if voucher.is_expired_at(Timestamp::now()) {
            debug!(expiry = %voucher.expiry, "voucher has expired, ignoring");

            return Ok(false);
        }

        for existing in self.voucher_items(cart)? {
            debug!(replaced = %existing.sku, "removing active voucher");

            self.store.delete_item(existing.id)?;
        }

        self.add(cart, voucher, 1, false)
    }

    /// Remove `quantity` units of a SKU, or the whole line.
    ///
    /// The line is deleted when no quantity (or zero) is given, or when the
    /// quantity would drop to zero. Returns `false` if the SKU is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(name = "carts.remove", skip_all, fields(cart_id = %cart.id(), sku = sku))]
    pub fn remove(
        &mut self,
        cart: &mut Cart,
        sku: &str,
        quantity: Option<u32>,
    ) -> Result<bool, CartError> {
        let removed = match self.store.find_item(cart.id(), sku)? {
            Some(mut item) => {
                match quantity {
                    Some(quantity) if quantity > 0 && quantity < item.quantity => {
                        item.quantity -= quantity;
                        self.store.update_item(&item)?;
                    }
                    _ => self.store.delete_item(item.id)?,
                }

                true
            }
            None => {
                debug!("sku not in cart");

                false
            }
        };

        self.process_vouchers(cart)?;
        self.reset_calculations(cart)?;

        Ok(removed)
    }

    /// Check whether the cart holds a SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn has_item(&self, cart: &Cart, sku: &str) -> Result<bool, CartError> {
        Ok(self.store.find_item(cart.id(), sku)?.is_some())
    }

    /// Check the cart against several SKUs: any of them, or all of them with
    /// `require_all`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn has_items(
        &self,
        cart: &Cart,
        skus: &[&str],
        require_all: bool,
    ) -> Result<bool, CartError> {
        let items = self.store.cart_items(cart.id())?;
        let in_cart = |sku: &&str| items.iter().any(|item| item.sku == *sku);

        Ok(if require_all {
            skus.iter().all(in_cart)
        } else {
            skus.iter().any(in_cart)
        })
    }

    /// Delete every line in the cart, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(name = "carts.clear", skip_all, fields(cart_id = %cart.id()))]
    pub fn clear(&mut self, cart: &mut Cart) -> Result<u64, CartError> {
        let removed = self.store.delete_cart_items(cart.id())?;

        self.reset_calculations(cart)?;

        Ok(removed)
    }

    /// Set a fixed shipping amount for the whole cart; zero restores per-item shipping.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(name = "carts.set_shipping", skip_all, fields(cart_id = %cart.id(), shipping = %shipping))]
    pub fn set_shipping(&mut self, cart: &mut Cart, shipping: Decimal) -> Result<(), CartError> {
        self.store.set_cart_shipping(cart.id(), shipping)?;

        cart.record.shipping = shipping;

        self.reset_calculations(cart)
    }

    /// Turn the cart into an order.
    ///
    /// The order snapshots totals computed from the lines it takes over, never
    /// from the cache, and the cart is left empty. Without a status code the configured placement
    /// status is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(
        name = "carts.place_order",
        skip_all,
        fields(cart_id = %cart.id(), order_id = tracing::field::Empty)
    )]
    pub fn place_order(
        &mut self,
        cart: &mut Cart,
        status_code: Option<&str>,
    ) -> Result<Order, CartError> {
        let status_code = status_code
            .filter(|code| !code.is_empty())
            .unwrap_or(&self.config.order_status_placement)
            .to_string();

        self.refresh(cart)?;

        let totals = self.calculate(cart)?;

        let order = self.store.create_order(NewOrder::from_totals(
            cart.owner().user_id(),
            status_code,
            &totals,
            Timestamp::now(),
        ))?;

        Span::current().record("order_id", tracing::field::display(order.id));

        let moved = self.store.move_items_to_order(cart.id(), order.id)?;

        self.reset_calculations(cart)?;

        info!(moved, total = %order.total_price, "order placed");

        Ok(order)
    }

    /// Line items placed with an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn order_items(&self, order: OrderId) -> Result<Vec<LineItem>, CartError> {
        Ok(self.store.order_items(order)?)
    }

    /// Copy every line of `source` into `cart`, returning how many lines applied.
    ///
    /// Lines go through the same rules as [`CartService::add`] and
    /// [`CartService::add_voucher`]; the source cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or cache fails.
    #[tracing::instrument(name = "carts.merge", skip_all, fields(cart_id = %cart.id(), source_id = %source.id()))]
    pub fn merge(&mut self, cart: &mut Cart, source: &Cart) -> Result<usize, CartError> {
        let mut merged = 0;

        for item in self.store.cart_items(source.id())? {
            let applied = match item.voucher() {
                Some(voucher) => self.add_voucher(cart, voucher)?,
                None => self.add(cart, &item, item.quantity, false)?,
            };

            if applied {
                merged += 1;
            }
        }

        Ok(merged)
    }

    /// Re-price every voucher line against the cart's current contents.
    fn process_vouchers(&mut self, cart: &Cart) -> Result<(), CartError> {
        let items = self.store.cart_items(cart.id())?;
        let qualifying_subtotal = self.engine.qualifying_subtotal(&items);

        for mut item in items {
            let price = match item.voucher() {
                Some(voucher) => voucher.evaluate(qualifying_subtotal),
                None => continue,
            };

            if item.unit_price != price {
                debug!(sku = %item.sku, %price, "re-priced voucher");

                item.unit_price = price;
                self.store.update_item(&item)?;
            }
        }

        Ok(())
    }

    /// Reload the cart record from the store.
    fn refresh(&self, cart: &mut Cart) -> Result<(), CartError> {
        cart.record = self
            .store
            .get_cart(cart.id())?
            .ok_or(StoreError::CartNotFound(cart.id()))?;

        Ok(())
    }

    /// Price the cart's current lines, bypassing the cache.
    fn calculate(&self, cart: &mut Cart) -> Result<Totals, CartError> {
        let items = self.store.cart_items(cart.id())?;
        let totals = self.engine.calculate(&items, cart.shipping());

        cart.calculations = Some(totals);

        Ok(totals)
    }

    fn reset_calculations(&self, cart: &mut Cart) -> Result<(), CartError> {
        cart.calculations = None;

        if self.config.cache_calculations {
            self.cache.forget(&self.cache_key(cart))?;
        }

        Ok(())
    }

    fn cache_key(&self, cart: &Cart) -> CacheKey {
        CacheKey::calculations(&self.config.cart_table, cart.id())
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use testresult::TestResult;

    use crate::{
        cache::{MemoryCache, MockCalculationCache},
        identity::{MockIdentityResolver, SessionId},
        store::{MemoryStore, MockCartStore},
    };

    use super::*;

    fn service() -> CartService<MemoryStore, MemoryCache> {
        CartService::new(MemoryStore::new(), MemoryCache::new(), ShopConfig::default())
    }

    fn future() -> Timestamp {
        Timestamp::now() + SignedDuration::from_hours(24)
    }

    fn quantities(
        service: &CartService<MemoryStore, MemoryCache>,
        cart: &Cart,
    ) -> Result<Vec<(String, u32)>, CartError> {
        Ok(service
            .items(cart)?
            .into_iter()
            .map(|item| (item.sku, item.quantity))
            .collect())
    }

    #[test]
    fn current_uses_authenticated_user() -> TestResult {
        let mut service = service();
        let mut session = SessionContext::new();
        let mut resolver = MockIdentityResolver::new();

        resolver
            .expect_current_user()
            .withf(|provider| provider == "web")
            .returning(|_| Some(UserId(7)));

        let cart = service.current(&mut session, &resolver)?;

        assert_eq!(cart.owner(), &Owner::User(UserId(7)));
        assert!(
            session.existing_session_id().is_none(),
            "no session id should be generated for users"
        );

        Ok(())
    }

    #[test]
    fn guest_cart_is_reused_within_session() -> TestResult {
        let mut service = service();
        let mut session = SessionContext::new();

        let first = service.current_session(&mut session)?;
        let second = service.current_session(&mut session)?;

        assert_eq!(first.id(), second.id());
        assert!(matches!(first.owner(), Owner::Session(_)));

        Ok(())
    }

    #[test]
    fn add_accumulates_and_resets_quantity() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        assert!(service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 2, false)?);
        assert!(service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 3, false)?);
        assert_eq!(quantities(&service, &cart)?, vec![("A".to_string(), 5)]);

        assert!(service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 1, true)?);
        assert_eq!(quantities(&service, &cart)?, vec![("A".to_string(), 1)]);

        Ok(())
    }

    #[test]
    fn reset_to_zero_removes_line() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 2, false)?;

        assert!(service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 0, true)?);
        assert!(!service.has_item(&cart, "A")?);

        Ok(())
    }

    #[test]
    fn zero_quantity_without_reset_is_ignored() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        assert!(!service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 0, false)?);
        assert!(!service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 0, true)?);
        assert!(service.items(&cart)?.is_empty());

        Ok(())
    }

    #[test]
    fn non_shoppable_items_are_ignored() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        let request = AddItemRequest::new("A", Decimal::ONE).with_shoppable(false);

        assert!(!service.add(&mut cart, request, 1, false)?);
        assert!(service.items(&cart)?.is_empty());

        Ok(())
    }

    #[test]
    fn line_items_capture_owner_and_currency() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(3))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 1, false)?;

        let Some(item) = service.items(&cart)?.into_iter().next() else {
            panic!("expected a line item");
        };

        assert_eq!(item.owner, Owner::User(UserId(3)));
        assert_eq!(item.currency, "USD");

        Ok(())
    }

    #[test]
    fn remove_decrements_then_deletes() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 5, false)?;

        assert!(service.remove(&mut cart, "A", Some(2))?);
        assert_eq!(quantities(&service, &cart)?, vec![("A".to_string(), 3)]);

        assert!(service.remove(&mut cart, "A", Some(3))?);
        assert!(!service.has_item(&cart, "A")?);

        Ok(())
    }

    #[test]
    fn remove_without_quantity_deletes_line() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 5, false)?;

        assert!(service.remove(&mut cart, "A", None)?);
        assert!(service.items(&cart)?.is_empty());

        Ok(())
    }

    #[test]
    fn remove_unknown_sku_returns_false() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        assert!(!service.remove(&mut cart, "missing", None)?);

        Ok(())
    }

    #[test]
    fn remove_unknown_sku_reprices_vouchers() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;
        let voucher = Voucher::fixed("FIVE", Decimal::from(5), Decimal::ZERO, future());

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(10)), 1, false)?;
        service.add_voucher(&mut cart, &voucher)?;

        let Some(mut stale) = service.store.find_item(cart.id(), "FIVE")? else {
            panic!("voucher line should exist");
        };
        stale.unit_price = Decimal::ZERO;
        service.store.update_item(&stale)?;

        service.remove(&mut cart, "missing", None)?;

        assert_eq!(
            service
                .store
                .find_item(cart.id(), "FIVE")?
                .map(|item| item.unit_price),
            Some(Decimal::from(-5))
        );

        Ok(())
    }

    #[test]
    fn has_items_any_or_all() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::ONE), 1, false)?;
        service.add(&mut cart, AddItemRequest::new("B", Decimal::ONE), 1, false)?;

        assert!(service.has_items(&cart, &["A", "Z"], false)?);
        assert!(!service.has_items(&cart, &["A", "Z"], true)?);
        assert!(service.has_items(&cart, &["A", "B"], true)?);
        assert!(service.has_items(&cart, &[], true)?);
        assert!(!service.has_items(&cart, &[], false)?);

        Ok(())
    }

    #[test]
    fn totals_are_recorded_and_cached() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(10)), 2, false)?;

        let totals = service.totals(&mut cart)?;

        assert_eq!(totals.total_price(), Decimal::from(20));
        assert_eq!(cart.calculations, Some(totals));
        assert!(service.cache().has(&service.cache_key(&cart))?);

        Ok(())
    }

    #[test]
    fn mutations_invalidate_calculations() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(10)), 1, false)?;
        service.totals(&mut cart)?;

        service.add(&mut cart, AddItemRequest::new("B", Decimal::from(5)), 1, false)?;

        assert_eq!(cart.calculations, None);
        assert!(!service.cache().has(&service.cache_key(&cart))?);
        assert_eq!(service.totals(&mut cart)?.total_price(), Decimal::from(15));

        Ok(())
    }

    #[test]
    fn disabled_cache_is_never_touched() -> TestResult {
        let config = ShopConfig {
            cache_calculations: false,
            ..ShopConfig::default()
        };

        let mut cache = MockCalculationCache::new();
        cache.expect_get().never();
        cache.expect_put().never();
        cache.expect_forget().never();

        let mut service = CartService::new(MemoryStore::new(), cache, config);
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(4)), 1, false)?;

        assert_eq!(service.totals(&mut cart)?.total_price(), Decimal::from(4));

        Ok(())
    }

    #[test]
    fn cached_totals_are_returned_without_item_reads() -> TestResult {
        let record = CartRecord {
            id: CartId(9),
            owner: Owner::Session(SessionId::new("guest")),
            shipping: Decimal::ZERO,
        };

        let mut store = MockCartStore::new();
        store.expect_cart_items().never();

        let stored = record.clone();
        store
            .expect_get_cart()
            .returning(move |_| Ok(Some(stored.clone())));

        let mut cache = MockCalculationCache::new();
        cache
            .expect_get()
            .withf(|key| key.as_str() == "shop_cart_9_calculations")
            .returning(|_| Ok(Some(Totals::default())));

        let service = CartService::new(store, cache, ShopConfig::default());
        let mut cart = Cart::from(record);

        assert_eq!(service.totals(&mut cart)?, Totals::default());

        Ok(())
    }

    #[test]
    fn totals_of_a_deleted_cart_fail() {
        let mut store = MockCartStore::new();
        store.expect_get_cart().returning(|_| Ok(None));

        let service = CartService::new(store, MemoryCache::new(), ShopConfig::default());
        let mut cart = Cart::from(CartRecord {
            id: CartId(4),
            owner: Owner::User(UserId(1)),
            shipping: Decimal::ZERO,
        });

        assert!(matches!(
            service.totals(&mut cart),
            Err(CartError::Store(StoreError::CartNotFound(CartId(4))))
        ));
    }

    #[test]
    fn remove_unknown_sku_still_invalidates() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(10)), 1, false)?;
        service.totals(&mut cart)?;

        let key = service.cache_key(&cart);
        assert!(service.cache().has(&key)?);

        assert!(!service.remove(&mut cart, "missing", None)?);
        assert!(!service.cache().has(&key)?, "cached totals should be forgotten");
        assert_eq!(cart.calculations(), None);

        Ok(())
    }

    #[test]
    fn place_order_ignores_cached_totals() -> TestResult {
        let mut cache = MockCalculationCache::new();
        cache.expect_get().never();
        cache.expect_put().never();
        cache.expect_forget().returning(|_| Ok(()));

        let mut service = CartService::new(MemoryStore::new(), cache, ShopConfig::default());
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(8)), 2, false)?;

        let order = service.place_order(&mut cart, None)?;

        assert_eq!(order.price, Decimal::from(16));

        Ok(())
    }

    #[test]
    fn store_errors_propagate() {
        let mut store = MockCartStore::new();
        store
            .expect_find_cart()
            .returning(|_| Err(StoreError::Unavailable("offline".to_string())));

        let mut service = CartService::new(store, MemoryCache::new(), ShopConfig::default());

        let result = service.find_by_user(UserId(1));

        assert!(matches!(
            result,
            Err(CartError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn cache_errors_propagate() -> TestResult {
        let mut cache = MockCalculationCache::new();
        cache
            .expect_forget()
            .returning(|_| Err(CacheError::Unavailable("offline".to_string())));

        let mut service = CartService::new(MemoryStore::new(), cache, ShopConfig::default());
        let mut cart = service.find_by_user(UserId(1))?;

        let result = service.clear(&mut cart);

        assert!(matches!(result, Err(CartError::Cache(_))));

        Ok(())
    }

    #[test]
    fn voucher_reprices_when_cart_changes() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;
        let voucher = Voucher::percentage("TENOFF", Decimal::from(10), Decimal::ZERO, future());

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(50)), 1, false)?;
        assert!(service.add_voucher(&mut cart, &voucher)?);

        let price = |service: &CartService<MemoryStore, MemoryCache>, cart: &Cart| {
            service
                .voucher_items(cart)
                .map(|vouchers| vouchers.first().map(|item| item.unit_price))
        };

        assert_eq!(price(&service, &cart)?, Some(Decimal::from(-5)));

        service.add(&mut cart, AddItemRequest::new("B", Decimal::from(50)), 1, false)?;

        assert_eq!(price(&service, &cart)?, Some(Decimal::from(-10)));

        Ok(())
    }

    #[test]
    fn set_shipping_updates_handle_and_totals() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(
            &mut cart,
            AddItemRequest::new("A", Decimal::from(10)).with_shipping(Decimal::from(2)),
            1,
            false,
        )?;

        assert_eq!(service.totals(&mut cart)?.total_shipping(), Decimal::from(2));

        service.set_shipping(&mut cart, Decimal::from(7))?;

        assert_eq!(cart.shipping(), Decimal::from(7));
        assert_eq!(service.totals(&mut cart)?.total_shipping(), Decimal::from(7));

        Ok(())
    }

    #[test]
    fn place_order_defaults_status_code() -> TestResult {
        let mut service = service();
        let mut cart = service.find_by_user(UserId(1))?;

        service.add(&mut cart, AddItemRequest::new("A", Decimal::from(10)), 1, false)?;

        let order = service.place_order(&mut cart, None)?;

        assert_eq!(order.status_code, "pending");
        assert_eq!(order.user_id, Some(UserId(1)));

        let placed = service.place_order(&mut cart, Some("completed"))?;

        assert_eq!(placed.status_code, "completed");
        assert_eq!(placed.total_price, Decimal::ZERO);

        Ok(())
    }
}
