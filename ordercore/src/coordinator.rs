//! Atomic order-creation coordination.
//!
//! The coordinator owns the write path for new orders. It assembles one
//! atomic conditioned batch (the order insert plus one stock decrement per
//! distinct product), submits it, and classifies the outcome:
//!
//! - commit succeeded: the order and its decrements applied together
//! - the order id already existed: resolved into an idempotent replay or a
//!   duplicate-mismatch error
//! - a stock condition failed: an inventory conflict, surfaced to the
//!   caller without any internal resubmission
//! - transient store trouble: retried with exponential backoff and jitter,
//!   each attempt bounded by a timeout
//!
//! The conditions carried by the batch make resubmission after an
//! indeterminate timeout safe: if the earlier attempt actually committed,
//! the replay resolves to the committed order instead of decrementing
//! stock a second time.

use crate::errors::{FailedCondition, OrderError, OrderResult, StoreError};
use crate::order::Order;
use crate::store::{CommerceStore, TransactOp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Configuration for transient-failure retry behavior.
///
/// Only transient store failures (`Unavailable`, `Timeout`) are retried.
/// Condition failures are deterministic and never retried internally.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between retry attempts.
    pub base_delay: Duration,
    /// Maximum delay between retry attempts (for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Upper bound on a single store attempt before it is treated as a
    /// transient timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// The successful outcomes of an order submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOrderOutcome {
    /// The batch committed; inventory was decremented exactly once.
    Created(Order),
    /// An order with identical contents was already committed under this
    /// id. Nothing changed; the existing order is returned.
    Replayed(Order),
}

impl CreateOrderOutcome {
    /// The committed order, whether fresh or replayed.
    pub const fn order(&self) -> &Order {
        match self {
            Self::Created(order) | Self::Replayed(order) => order,
        }
    }

    /// Consumes the outcome, returning the committed order.
    pub fn into_order(self) -> Order {
        match self {
            Self::Created(order) | Self::Replayed(order) => order,
        }
    }

    /// True when this submission was an idempotent duplicate.
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// Coordinates the all-or-nothing commit of a new order.
#[derive(Debug, Clone)]
pub struct OrderTransactionCoordinator<S> {
    store: Arc<S>,
    retry_config: RetryConfig,
}

impl<S> OrderTransactionCoordinator<S>
where
    S: CommerceStore,
{
    /// Creates a coordinator with default retry configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            retry_config: RetryConfig::default(),
        }
    }

    /// Sets the retry configuration for this coordinator.
    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Submits an order for atomic commit.
    ///
    /// Either the order record and every stock decrement become visible
    /// together, or none of them do. The order passed in must be freshly
    /// built (status `Confirmed`); the same order may be submitted again
    /// after any error without risking a double decrement.
    #[instrument(skip(self, order), fields(order_id = %order.order_id()))]
    pub async fn submit(&self, order: Order) -> OrderResult<CreateOrderOutcome> {
        let ops = Self::build_ops(&order);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.attempt_commit(&ops).await {
                Ok(()) => {
                    info!(
                        "Order {} committed with {} stock decrement(s) on attempt {attempt}",
                        order.order_id(),
                        ops.len() - 1
                    );
                    return Ok(CreateOrderOutcome::Created(order));
                }
                Err(StoreError::ConditionFailed(conditions)) => {
                    return self.classify_rejection(&order, conditions).await;
                }
                Err(err) if err.is_transient() && attempt < self.retry_config.max_attempts => {
                    let delay = self.retry_delay(attempt);
                    warn!(
                        "Transient store failure on attempt {attempt} for order {}: {err}; retrying in {delay:?}",
                        order.order_id()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        "Giving up on order {} after {attempt} attempts: {err}",
                        order.order_id()
                    );
                    return Err(OrderError::ServiceUnavailable { attempts: attempt });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Builds the conditioned batch for an order.
    ///
    /// One decrement per distinct product, quantities aggregated across
    /// repeated lines, in sorted product order so batches are
    /// deterministic.
    fn build_ops(order: &Order) -> Vec<TransactOp> {
        let mut quantities: Vec<_> = order.quantities_by_product().into_iter().collect();
        quantities.sort_by(|a, b| a.0.cmp(&b.0));

        let mut ops = Vec::with_capacity(quantities.len() + 1);
        ops.push(TransactOp::put_order(order.clone()));
        for (product_id, quantity) in quantities {
            ops.push(TransactOp::decrement_stock(product_id, quantity));
        }
        ops
    }

    /// Runs one store attempt under the configured timeout.
    async fn attempt_commit(&self, ops: &[TransactOp]) -> Result<(), StoreError> {
        let submission = self.store.transact_write(ops.to_vec());
        match tokio::time::timeout(self.retry_config.attempt_timeout, submission).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.retry_config.attempt_timeout)),
        }
    }

    /// Classifies a condition-failed rejection.
    ///
    /// A failed order-exists condition takes precedence over failed stock
    /// conditions: when the order already exists this submission was never
    /// going to decrement anything, so the only question is whether it is
    /// an idempotent replay.
    async fn classify_rejection(
        &self,
        order: &Order,
        conditions: Vec<FailedCondition>,
    ) -> OrderResult<CreateOrderOutcome> {
        let duplicate = conditions
            .iter()
            .any(|c| matches!(c, FailedCondition::OrderAlreadyExists { .. }));
        if duplicate {
            return self.resolve_duplicate(order).await;
        }
        Err(StoreError::ConditionFailed(conditions).into())
    }

    /// Resolves a duplicate-id rejection into replay or mismatch.
    async fn resolve_duplicate(&self, order: &Order) -> OrderResult<CreateOrderOutcome> {
        let existing = self
            .store
            .get_order(order.order_id())
            .await
            .map_err(OrderError::from)?;

        match existing {
            Some(existing)
                if existing.same_contents(order.user_id(), &order.quantities_by_product()) =>
            {
                info!(
                    "Order {} was already committed; returning existing order",
                    order.order_id()
                );
                Ok(CreateOrderOutcome::Replayed(existing))
            }
            Some(_) => Err(OrderError::DuplicateOrderMismatch {
                order_id: order.order_id().clone(),
            }),
            // Orders are insert-only, so an id that just failed the
            // no-existing-order condition must be readable.
            None => Err(OrderError::Store(StoreError::Internal(format!(
                "order {} reported as existing but could not be read",
                order.order_id()
            )))),
        }
    }

    /// Computes the backoff delay for a retry, with ±25% jitter.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn retry_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base_delay_ms = self.retry_config.base_delay.as_millis() as f64;
        let max_delay_ms = self.retry_config.max_delay.as_millis() as f64;

        let delay = base_delay_ms * self.retry_config.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(max_delay_ms);

        // Add jitter (±25% of the delay)
        let mut rng = rand::rng();
        let jitter = delay * 0.25 * (rng.random::<f64>() - 0.5) * 2.0;
        let final_delay = (delay + jitter).max(0.0).min(max_delay_ms) as u64;

        Duration::from_millis(final_delay)
    }
}
