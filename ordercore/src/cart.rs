//! Post-commit cart clearing.
//!
//! After an order commits, the purchased lines should disappear from the
//! user's cart. That cleanup is best-effort and asynchronous: it runs on a
//! spawned task, retries a bounded number of times with a fixed delay, and
//! its failure never affects the already committed order. A stale cart
//! line is a cosmetic problem; every failure is logged so it is at least
//! visible.

use crate::errors::StoreResult;
use crate::types::{ProductId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Shopping cart mutation used after order commit.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Removes the given products from the user's cart.
    ///
    /// Must be idempotent: removing a line that is already gone succeeds,
    /// so a retried cleanup can never fail on its own earlier progress.
    async fn remove_items(&self, user_id: &UserId, product_ids: &[ProductId]) -> StoreResult<()>;
}

/// Spawns supervised cart cleanup tasks after order commits.
#[derive(Debug, Clone)]
pub struct CartClearer<C> {
    cart_store: Arc<C>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<C> CartClearer<C>
where
    C: CartStore + 'static,
{
    /// Creates a clearer with 3 attempts and a 100ms delay between them.
    pub fn new(cart_store: Arc<C>) -> Self {
        Self {
            cart_store,
            max_attempts: 3,
            retry_delay: Duration::from_millis(100),
        }
    }

    /// Sets how many removal attempts are made before giving up.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay between removal attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Starts cart cleanup on a background task.
    ///
    /// Returns the task handle so callers that care (tests, shutdown
    /// paths) can await completion; dropping it detaches the task.
    pub fn clear_async(&self, user_id: UserId, product_ids: Vec<ProductId>) -> JoinHandle<()> {
        let store = Arc::clone(&self.cart_store);
        let max_attempts = self.max_attempts;
        let retry_delay = self.retry_delay;

        tokio::spawn(async move {
            for attempt in 1..=max_attempts {
                match store.remove_items(&user_id, &product_ids).await {
                    Ok(()) => {
                        debug!(
                            "Cleared {} cart line(s) for user {user_id}",
                            product_ids.len()
                        );
                        return;
                    }
                    Err(err) if attempt < max_attempts => {
                        warn!(
                            "Cart clearing attempt {attempt} failed for user {user_id}: {err}; retrying in {retry_delay:?}"
                        );
                        tokio::time::sleep(retry_delay).await;
                    }
                    Err(err) => {
                        error!(
                            "Cart clearing failed for user {user_id} after {attempt} attempts: {err}; cart left stale"
                        );
                    }
                }
            }
        })
    }
}
