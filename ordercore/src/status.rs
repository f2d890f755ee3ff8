//! Order lifecycle transitions.
//!
//! The status machine is a read, a table check, and a conditioned write.
//! The write expects exactly the status that was read, so two callers
//! racing the same order produce one winner and one typed
//! `TransitionConflict`, never a lost update. Cancellation changes only
//! the order's status; inventory replenishment belongs to external restock
//! processes.

use crate::errors::{FailedCondition, OrderError, OrderResult, StoreError};
use crate::order::{Order, OrderStatus};
use crate::store::{CommerceStore, TransactOp};
use crate::types::{OrderId, Timestamp, TrackingNumber};
use std::sync::Arc;
use tracing::{info, instrument};

/// Applies lifecycle transitions to committed orders.
#[derive(Debug, Clone)]
pub struct OrderStatusMachine<S> {
    store: Arc<S>,
}

impl<S> OrderStatusMachine<S>
where
    S: CommerceStore,
{
    /// Creates a status machine over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Moves an order to a new lifecycle state.
    ///
    /// Marking an order `Shipped` requires a tracking number; other
    /// transitions ignore `tracking_number` unless one is supplied to
    /// overwrite. Returns the updated order on success. On a rejected
    /// transition the order is unchanged.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn transition(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        tracking_number: Option<TrackingNumber>,
    ) -> OrderResult<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await
            .map_err(OrderError::from)?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.clone(),
            })?;

        let current = order.status();
        if !current.can_transition_to(new_status) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }
        if new_status == OrderStatus::Shipped && tracking_number.is_none() {
            return Err(OrderError::MissingTrackingNumber);
        }

        let updated_at = Timestamp::now();
        let op = TransactOp::set_order_status(
            order_id.clone(),
            current,
            new_status,
            tracking_number.clone(),
            updated_at,
        );

        match self.store.transact_write(vec![op]).await {
            Ok(()) => {
                info!("Order {order_id} moved from {current} to {new_status}");
                Ok(order.apply_status(new_status, tracking_number, updated_at))
            }
            Err(StoreError::ConditionFailed(conditions)) => {
                Err(Self::classify_rejection(order_id, conditions))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Maps a rejected status write onto the order error taxonomy.
    fn classify_rejection(order_id: &OrderId, conditions: Vec<FailedCondition>) -> OrderError {
        for condition in &conditions {
            match condition {
                FailedCondition::StatusMismatch { .. } => {
                    return OrderError::TransitionConflict {
                        order_id: order_id.clone(),
                    }
                }
                FailedCondition::OrderMissing { .. } => {
                    return OrderError::NotFound {
                        order_id: order_id.clone(),
                    }
                }
                _ => {}
            }
        }
        OrderError::Store(StoreError::ConditionFailed(conditions))
    }
}
