//! In-memory adapters for the `OrderCore` engine
//!
//! This crate provides in-memory implementations of the `CommerceStore`,
//! `ProductCatalog`, and `CartStore` traits from the ordercore crate, useful
//! for testing and development scenarios where persistence is not required.
//!
//! The store honors the atomic-write contract: every condition in a batch is
//! verified against current state under one lock acquisition, and mutations
//! are applied only when all of them hold.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ordercore::cart::CartStore;
use ordercore::catalog::{ProductCatalog, ProductInfo};
use ordercore::errors::{FailedCondition, StoreError, StoreResult};
use ordercore::order::Order;
use ordercore::store::{
    CommerceStore, InventoryRecord, OrderPage, OrderPageKey, OrderQuery, TransactOp,
};
use ordercore::types::{Money, OrderId, ProductId, Timestamp, UserId};
use tracing::debug;

/// Thread-safe in-memory commerce store for testing
#[derive(Clone, Default)]
pub struct InMemoryCommerceStore {
    // Maps order IDs to committed orders
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    // Maps product IDs to their inventory records
    inventory: Arc<RwLock<HashMap<ProductId, InventoryRecord>>>,
}

impl InMemoryCommerceStore {
    /// Create a new empty in-memory commerce store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product's inventory record, replacing any existing one.
    pub fn set_stock(&self, product_id: ProductId, available_quantity: u32) {
        let mut inventory = self.inventory.write().expect("RwLock poisoned");
        inventory.insert(
            product_id.clone(),
            InventoryRecord::new(product_id, available_quantity),
        );
    }

    /// Add stock to a product, standing in for an external restock process.
    ///
    /// Creates the inventory record when none exists.
    pub fn restock(&self, product_id: &ProductId, quantity: u32) {
        let mut inventory = self.inventory.write().expect("RwLock poisoned");
        let record = inventory
            .entry(product_id.clone())
            .or_insert_with(|| InventoryRecord::new(product_id.clone(), 0));
        record.available_quantity = record.available_quantity.saturating_add(quantity);
        record.updated_at = Timestamp::now();
    }

    /// Current inventory record for a product, if one exists.
    pub fn inventory_record(&self, product_id: &ProductId) -> Option<InventoryRecord> {
        let inventory = self.inventory.read().expect("RwLock poisoned");
        inventory.get(product_id).cloned()
    }

    /// Number of committed orders.
    pub fn order_count(&self) -> usize {
        let orders = self.orders.read().expect("RwLock poisoned");
        orders.len()
    }

    /// Verifies every condition in the batch against current state.
    ///
    /// Stock checks are cumulative: two decrements of the same product in
    /// one batch must fit the available quantity together, never just
    /// individually.
    fn verify(
        orders: &HashMap<OrderId, Order>,
        inventory: &HashMap<ProductId, InventoryRecord>,
        ops: &[TransactOp],
    ) -> Vec<FailedCondition> {
        let mut failed = Vec::new();
        let mut pending: HashMap<ProductId, u32> = HashMap::new();

        for op in ops {
            match op {
                TransactOp::PutOrder(order) => {
                    if orders.contains_key(order.order_id()) {
                        failed.push(FailedCondition::OrderAlreadyExists {
                            order_id: order.order_id().clone(),
                        });
                    }
                }
                TransactOp::DecrementStock {
                    product_id,
                    quantity,
                } => {
                    let available = inventory
                        .get(product_id)
                        .map_or(0, |record| record.available_quantity);
                    let already_claimed = pending.get(product_id).copied().unwrap_or(0);
                    let remaining = available.saturating_sub(already_claimed);
                    if remaining < *quantity {
                        failed.push(FailedCondition::InsufficientStock {
                            product_id: product_id.clone(),
                            requested: *quantity,
                            available: remaining,
                        });
                    } else {
                        *pending.entry(product_id.clone()).or_insert(0) += quantity;
                    }
                }
                TransactOp::SetOrderStatus {
                    order_id, expected, ..
                } => match orders.get(order_id) {
                    None => failed.push(FailedCondition::OrderMissing {
                        order_id: order_id.clone(),
                    }),
                    Some(order) if order.status() != *expected => {
                        failed.push(FailedCondition::StatusMismatch {
                            order_id: order_id.clone(),
                            expected: *expected,
                            actual: order.status(),
                        });
                    }
                    Some(_) => {}
                },
            }
        }

        failed
    }
}

#[async_trait]
impl CommerceStore for InMemoryCommerceStore {
    async fn transact_write(&self, ops: Vec<TransactOp>) -> StoreResult<()> {
        let mut orders = self.orders.write().expect("RwLock poisoned");
        let mut inventory = self.inventory.write().expect("RwLock poisoned");

        // First, verify all conditions against current state
        let failed = Self::verify(&orders, &inventory, &ops);
        if !failed.is_empty() {
            debug!(
                "Rejected transactional batch: {} failed condition(s)",
                failed.len()
            );
            return Err(StoreError::ConditionFailed(failed));
        }

        // All conditions hold, proceed with the mutations
        for op in ops {
            match op {
                TransactOp::PutOrder(order) => {
                    orders.insert(order.order_id().clone(), *order);
                }
                TransactOp::DecrementStock {
                    product_id,
                    quantity,
                } => {
                    if let Some(record) = inventory.get_mut(&product_id) {
                        record.available_quantity -= quantity;
                        record.updated_at = Timestamp::now();
                    }
                }
                TransactOp::SetOrderStatus {
                    order_id,
                    new_status,
                    tracking_number,
                    updated_at,
                    ..
                } => {
                    if let Some(order) = orders.get(&order_id) {
                        let updated = order.apply_status(new_status, tracking_number, updated_at);
                        orders.insert(order_id, updated);
                    }
                }
            }
        }

        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        let orders = self.orders.read().expect("RwLock poisoned");

        Ok(orders.get(order_id).cloned())
    }

    async fn user_orders(&self, user_id: &UserId, query: &OrderQuery) -> StoreResult<OrderPage> {
        let orders = self.orders.read().expect("RwLock poisoned");

        // Newest first, order id breaking creation-time ties
        let mut all: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.order_id().cmp(a.order_id()))
        });

        // Resume strictly after the continuation key
        let start = match &query.start_after {
            Some(key) => all
                .iter()
                .position(|o| &OrderPageKey::for_order(o) == key)
                .map_or(all.len(), |p| p + 1),
            None => 0,
        };

        let matches: Vec<Order> = all[start..]
            .iter()
            .filter(|o| query.status.map_or(true, |s| o.status() == s))
            .cloned()
            .collect();

        let limit = usize::try_from(query.limit.value()).unwrap_or(usize::MAX);
        let page: Vec<Order> = matches.iter().take(limit).cloned().collect();
        let last_key = if matches.len() > limit {
            page.last().map(OrderPageKey::for_order)
        } else {
            None
        };

        Ok(OrderPage {
            orders: page,
            last_key,
        })
    }

    async fn available_quantity(&self, product_id: &ProductId) -> StoreResult<u32> {
        let inventory = self.inventory.read().expect("RwLock poisoned");

        Ok(inventory
            .get(product_id)
            .map_or(0, |record| record.available_quantity))
    }
}

/// Thread-safe in-memory product catalog for testing
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductInfo>>>,
}

impl InMemoryProductCatalog {
    /// Create a new empty in-memory product catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog entry.
    pub fn insert_product(&self, product_id: ProductId, info: ProductInfo) {
        let mut products = self.products.write().expect("RwLock poisoned");
        products.insert(product_id, info);
    }

    /// Change a product's price; returns false when the product is unknown.
    pub fn set_price(&self, product_id: &ProductId, unit_price: Money) -> bool {
        let mut products = self.products.write().expect("RwLock poisoned");
        products.get_mut(product_id).is_some_and(|info| {
            info.unit_price = unit_price;
            true
        })
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<ProductInfo>> {
        let products = self.products.read().expect("RwLock poisoned");

        Ok(products.get(product_id).cloned())
    }
}

/// Thread-safe in-memory shopping cart store for testing
///
/// Carries an injectable failure budget so tests can exercise the
/// best-effort retry behavior of post-commit cart clearing.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, HashSet<ProductId>>>>,
    failures_remaining: Arc<AtomicU32>,
}

impl InMemoryCartStore {
    /// Create a new empty in-memory cart store
    pub fn new() -> Self {
        Self::default()
    }

    /// Put products into a user's cart.
    pub fn add_items(&self, user_id: UserId, product_ids: Vec<ProductId>) {
        let mut carts = self.carts.write().expect("RwLock poisoned");
        carts.entry(user_id).or_default().extend(product_ids);
    }

    /// Current contents of a user's cart.
    pub fn cart_contents(&self, user_id: &UserId) -> HashSet<ProductId> {
        let carts = self.carts.read().expect("RwLock poisoned");
        carts.get(user_id).cloned().unwrap_or_default()
    }

    /// Make the next `count` removal calls fail with a transient error.
    pub fn fail_next_removals(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn remove_items(&self, user_id: &UserId, product_ids: &[ProductId]) -> StoreResult<()> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(
                "injected cart failure".to_string(),
            ));
        }

        let mut carts = self.carts.write().expect("RwLock poisoned");
        if let Some(cart) = carts.get_mut(user_id) {
            for product_id in product_ids {
                cart.remove(product_id);
            }
        }
        // Removing lines that are already gone is a success
        Ok(())
    }
}
