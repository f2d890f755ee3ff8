//! The order service façade.
//!
//! `OrderService` wires the full creation pipeline together: advisory
//! validation, pricing, the atomic commit, and post-commit cart clearing.
//! Callers that need finer control can use the individual components
//! directly; the façade exists so the common path is one call.

use crate::cart::{CartClearer, CartStore};
use crate::catalog::ProductCatalog;
use crate::coordinator::{CreateOrderOutcome, OrderTransactionCoordinator, RetryConfig};
use crate::errors::OrderResult;
use crate::order::{Order, OrderStatus};
use crate::pricing::PricingCalculator;
use crate::query::{OrderHistoryPage, OrderQueryService};
use crate::status::OrderStatusMachine;
use crate::store::CommerceStore;
use crate::types::{OrderId, PageSize, ProductId, Region, TrackingNumber, UserId};
use crate::validation::{OrderItemValidator, RequestedItem};
use std::sync::Arc;
use tracing::instrument;

/// Everything needed to place an order.
///
/// `order_id` is the client-supplied idempotency key: resubmitting the
/// same request with the same id replays the original outcome instead of
/// placing a second order.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Client-chosen unique order id.
    pub order_id: OrderId,
    /// The purchasing user.
    pub user_id: UserId,
    /// Requested product lines, kept in submission order.
    pub items: Vec<RequestedItem>,
    /// Destination region for tax and shipping, when known.
    pub destination: Option<Region>,
}

/// Façade over the order creation and lifecycle components.
#[derive(Debug, Clone)]
pub struct OrderService<S, C, K> {
    validator: OrderItemValidator<S, C>,
    pricing: PricingCalculator,
    coordinator: OrderTransactionCoordinator<S>,
    status_machine: OrderStatusMachine<S>,
    query: OrderQueryService<S>,
    cart_clearer: CartClearer<K>,
}

impl<S, C, K> OrderService<S, C, K>
where
    S: CommerceStore + 'static,
    C: ProductCatalog + 'static,
    K: CartStore + 'static,
{
    /// Builds a service over the given store, catalog, and cart backend
    /// with default pricing and retry behavior.
    pub fn new(store: Arc<S>, catalog: Arc<C>, cart_store: Arc<K>) -> Self {
        Self {
            validator: OrderItemValidator::new(Arc::clone(&store), catalog),
            pricing: PricingCalculator::default(),
            coordinator: OrderTransactionCoordinator::new(Arc::clone(&store)),
            status_machine: OrderStatusMachine::new(Arc::clone(&store)),
            query: OrderQueryService::new(store),
            cart_clearer: CartClearer::new(cart_store),
        }
    }

    /// Replaces the pricing calculator.
    #[must_use]
    pub fn with_pricing(mut self, pricing: PricingCalculator) -> Self {
        self.pricing = pricing;
        self
    }

    /// Replaces the commit retry configuration.
    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.coordinator = self.coordinator.with_retry_config(config);
        self
    }

    /// Replaces the cart clearer, for tuning its retry behavior.
    #[must_use]
    pub fn with_cart_clearer(mut self, cart_clearer: CartClearer<K>) -> Self {
        self.cart_clearer = cart_clearer;
        self
    }

    /// Places an order.
    ///
    /// Runs the advisory validation, prices the validated items, and
    /// submits the atomic commit. On success (fresh or replayed) the
    /// purchased products are cleared from the user's cart in the
    /// background; a failed submission leaves the cart untouched.
    #[instrument(
        skip(self, request),
        fields(order_id = %request.order_id, user_id = %request.user_id)
    )]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> OrderResult<CreateOrderOutcome> {
        let items = self.validator.validate(&request.items).await?;
        let breakdown = self.pricing.price(&items, request.destination.as_ref())?;

        let user_id = request.user_id.clone();
        let order = Order::new(request.order_id, request.user_id, items, breakdown)?;
        let product_ids: Vec<ProductId> = order.quantities_by_product().into_keys().collect();

        let outcome = self.coordinator.submit(order).await?;

        // Post-commit, detached: the response must not wait on the cart.
        // Replayed submissions clear again, which is harmless.
        drop(self.cart_clearer.clear_async(user_id, product_ids));
        Ok(outcome)
    }

    /// Fetches a single order by id.
    pub async fn get_order(&self, order_id: &OrderId) -> OrderResult<Order> {
        self.query.get_order(order_id).await
    }

    /// Lists a user's orders, newest first, continuing from `cursor`.
    pub async fn list_orders(
        &self,
        user_id: &UserId,
        cursor: Option<&str>,
        page_size: Option<PageSize>,
        status: Option<OrderStatus>,
    ) -> OrderResult<OrderHistoryPage> {
        self.query
            .user_orders(user_id, cursor, page_size, status)
            .await
    }

    /// Moves an order to a new lifecycle state.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        tracking_number: Option<TrackingNumber>,
    ) -> OrderResult<Order> {
        self.status_machine
            .transition(order_id, new_status, tracking_number)
            .await
    }
}
