//! Storage abstraction for orders and inventory.
//!
//! [`CommerceStore`] is the engine's load-bearing contract: an atomic,
//! multi-entity conditioned write plus the point and range reads the query
//! side needs. Adapters implement it against a concrete backend; the
//! in-memory adapter lives in its own crate.

use crate::errors::StoreResult;
use crate::order::{Order, OrderStatus};
use crate::types::{OrderId, PageSize, ProductId, Timestamp, TrackingNumber, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single conditioned operation within an atomic batch.
///
/// Every operation carries its own condition. The batch commits only if
/// every condition holds against current state; otherwise nothing is
/// applied and the store reports each failed condition as a typed
/// [`crate::errors::FailedCondition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactOp {
    /// Insert an order, conditioned on no order existing with its id.
    ///
    /// This condition is the idempotency guard for order creation.
    PutOrder(Box<Order>),

    /// Decrement available stock, conditioned on
    /// `available_quantity >= quantity`.
    ///
    /// A product with no inventory record behaves as `available = 0`, so
    /// the condition fails rather than creating stock from nothing.
    DecrementStock {
        /// The product whose stock is consumed
        product_id: ProductId,
        /// Total quantity to decrement (aggregated across order lines)
        quantity: u32,
    },

    /// Update an order's status, conditioned on the order existing with
    /// exactly the expected status.
    ///
    /// This is the optimistic-concurrency guard for lifecycle transitions.
    SetOrderStatus {
        /// The order to update
        order_id: OrderId,
        /// The status the caller observed before requesting the change
        expected: OrderStatus,
        /// The status to record
        new_status: OrderStatus,
        /// Tracking number to record, when shipping
        tracking_number: Option<TrackingNumber>,
        /// New modification timestamp
        updated_at: Timestamp,
    },
}

impl TransactOp {
    /// Builds a conditioned order insert.
    pub fn put_order(order: Order) -> Self {
        Self::PutOrder(Box::new(order))
    }

    /// Builds a conditioned stock decrement.
    pub const fn decrement_stock(product_id: ProductId, quantity: u32) -> Self {
        Self::DecrementStock {
            product_id,
            quantity,
        }
    }

    /// Builds a conditioned status update.
    pub const fn set_order_status(
        order_id: OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
        tracking_number: Option<TrackingNumber>,
        updated_at: Timestamp,
    ) -> Self {
        Self::SetOrderStatus {
            order_id,
            expected,
            new_status,
            tracking_number,
            updated_at,
        }
    }
}

/// Per-product stock record.
///
/// `available_quantity` is only ever decremented through a conditioned
/// [`TransactOp::DecrementStock`] inside an atomic batch; replenishment
/// belongs to external restock processes. `reserved_quantity` is carried
/// for those processes and is not touched by order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// The product this record tracks
    pub product_id: ProductId,
    /// Units available for sale
    pub available_quantity: u32,
    /// Units held by external reservation flows
    pub reserved_quantity: u32,
    /// When the record last changed
    pub updated_at: Timestamp,
}

impl InventoryRecord {
    /// Creates a record with the given available stock and no reservations.
    pub fn new(product_id: ProductId, available_quantity: u32) -> Self {
        Self {
            product_id,
            available_quantity,
            reserved_quantity: 0,
            updated_at: Timestamp::now(),
        }
    }
}

/// Continuation key for order listing, naming the last order of a page.
///
/// Serialized into the opaque cursor handed to clients; the field layout is
/// therefore part of the cursor format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPageKey {
    /// Creation time of the last order on the page
    pub created_at: Timestamp,
    /// Id of the last order on the page, breaking creation-time ties
    pub order_id: OrderId,
}

impl OrderPageKey {
    /// The continuation key pointing at a given order.
    pub fn for_order(order: &Order) -> Self {
        Self {
            created_at: order.created_at(),
            order_id: order.order_id().clone(),
        }
    }
}

/// Parameters for a user's order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Resume strictly after this key, in reverse-chronological order
    pub start_after: Option<OrderPageKey>,
    /// Maximum orders to return
    pub limit: PageSize,
    /// Only return orders in this status
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    /// A query for the first page with default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the continuation key.
    #[must_use]
    pub fn starting_after(mut self, key: OrderPageKey) -> Self {
        self.start_after = Some(key);
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: PageSize) -> Self {
        self.limit = limit;
        self
    }

    /// Restricts results to a single status.
    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// One page of a user's orders, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    /// The orders on this page
    pub orders: Vec<Order>,
    /// Key of the last order, present when more pages may follow
    pub last_key: Option<OrderPageKey>,
}

/// The storage engine contract.
///
/// Implementations must make [`transact_write`](CommerceStore::transact_write)
/// atomic: all conditions verified against current state, then all
/// mutations applied, or the whole batch rejected with every failed
/// condition reported. Reads are point-in-time snapshots with no locks.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Atomically applies a batch of conditioned operations.
    ///
    /// Returns `Err(StoreError::ConditionFailed)` with one entry per failed
    /// condition when the batch is rejected. Transient trouble surfaces as
    /// `Unavailable` or `Timeout`, in which case the batch may be safely
    /// resubmitted: the conditions themselves make replays harmless.
    async fn transact_write(&self, ops: Vec<TransactOp>) -> StoreResult<()>;

    /// Point lookup of an order.
    async fn get_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>>;

    /// Lists a user's orders, most recent first, using keyset continuation.
    ///
    /// Never computes a total count; the page's `last_key` is the only
    /// continuation state.
    async fn user_orders(&self, user_id: &UserId, query: &OrderQuery) -> StoreResult<OrderPage>;

    /// Currently available stock for a product; `0` when no record exists.
    async fn available_quantity(&self, product_id: &ProductId) -> StoreResult<u32>;
}
