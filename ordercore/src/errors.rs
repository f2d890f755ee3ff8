//! Error types for `OrderCore`.
//!
//! This module provides the error taxonomy for every failure scenario in the
//! order engine. The error design follows these principles:
//!
//! - **Rich error information**: Include context to help diagnose issues
//! - **Type safety**: Condition failures are enum variants, never matched by
//!   message substring
//! - **Actionable**: Callers can determine from the kind alone whether to
//!   fix input, resubmit, or back off
//! - **Composable**: Errors convert between layers via `From`
//!
//! # Error Categories
//!
//! - **`OrderError`**: Business-level outcomes of order operations
//! - **`StoreError`**: Storage engine failures, including typed condition
//!   failures from atomic writes
//! - **`ValidationError`**: Input validation failures at system boundaries

use crate::order::OrderStatus;
use crate::types::{
    Money, MoneyError, OrderId, OrderIdError, PageSizeError, ProductId, ProductIdError,
    QuantityError, RegionError, TrackingNumberError, UserIdError,
};
use thiserror::Error;

/// Errors raised when raw input fails to parse into domain types.
///
/// These occur only at system boundaries. Once input is parsed into domain
/// types, those types guarantee validity throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The order identifier was malformed.
    #[error("Invalid order ID: {0}")]
    InvalidOrderId(String),

    /// The user identifier was malformed.
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// The product identifier was malformed.
    #[error("Invalid product ID: {0}")]
    InvalidProductId(String),

    /// The quantity was out of range.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The monetary amount was invalid.
    #[error("Invalid money amount: {0}")]
    InvalidMoney(String),

    /// The destination region code was malformed.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// The tracking number was malformed.
    #[error("Invalid tracking number: {0}")]
    InvalidTrackingNumber(String),

    /// The requested page size was out of range.
    #[error("Invalid page size: {0}")]
    InvalidPageSize(String),

    /// An order must contain at least one item.
    #[error("An order must contain at least one item")]
    EmptyItems,

    /// A pagination cursor could not be decoded.
    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    /// The stored totals do not satisfy the price-breakdown invariant.
    #[error("Order total {actual} does not match breakdown sum {expected}")]
    TotalMismatch {
        /// Sum of subtotal, tax and shipping
        expected: Money,
        /// The total that was supplied
        actual: Money,
    },
}

impl From<OrderIdError> for ValidationError {
    fn from(err: OrderIdError) -> Self {
        Self::InvalidOrderId(err.to_string())
    }
}

impl From<UserIdError> for ValidationError {
    fn from(err: UserIdError) -> Self {
        Self::InvalidUserId(err.to_string())
    }
}

impl From<ProductIdError> for ValidationError {
    fn from(err: ProductIdError) -> Self {
        Self::InvalidProductId(err.to_string())
    }
}

impl From<QuantityError> for ValidationError {
    fn from(err: QuantityError) -> Self {
        Self::InvalidQuantity(err.to_string())
    }
}

impl From<MoneyError> for ValidationError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidMoney(err.to_string())
    }
}

impl From<RegionError> for ValidationError {
    fn from(err: RegionError) -> Self {
        Self::InvalidRegion(err.to_string())
    }
}

impl From<TrackingNumberError> for ValidationError {
    fn from(err: TrackingNumberError) -> Self {
        Self::InvalidTrackingNumber(err.to_string())
    }
}

impl From<PageSizeError> for ValidationError {
    fn from(err: PageSizeError) -> Self {
        Self::InvalidPageSize(err.to_string())
    }
}

/// A single failed condition from an atomic write.
///
/// Every operation in a transactional batch carries a condition; when the
/// batch is rejected, the store reports exactly which conditions failed as
/// typed variants. Callers branch on these kinds, never on message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailedCondition {
    /// An order with this identifier already exists.
    #[error("Order '{order_id}' already exists")]
    OrderAlreadyExists {
        /// The conflicting order identifier
        order_id: OrderId,
    },

    /// Available stock was below the requested decrement.
    ///
    /// A missing inventory record reports `available: 0`.
    #[error("Insufficient stock for product '{product_id}': requested {requested}, available {available}")]
    InsufficientStock {
        /// The product whose stock check failed
        product_id: ProductId,
        /// The quantity the batch tried to decrement
        requested: u32,
        /// The quantity actually available
        available: u32,
    },

    /// A conditioned update targeted an order that does not exist.
    #[error("Order '{order_id}' not found")]
    OrderMissing {
        /// The missing order identifier
        order_id: OrderId,
    },

    /// The order's current status did not match the expected status.
    #[error("Order '{order_id}' status is {actual}, expected {expected}")]
    StatusMismatch {
        /// The order whose status check failed
        order_id: OrderId,
        /// The status the batch expected
        expected: OrderStatus,
        /// The status actually stored
        actual: OrderStatus,
    },
}

/// Errors raised by the storage engine.
///
/// `ConditionFailed` is the atomic write's rejection outcome and carries the
/// typed per-operation failures. `Unavailable` and `Timeout` are transient
/// and safe to retry; the idempotency condition on order inserts makes
/// resubmission after an indeterminate timeout safe as well.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// One or more operation conditions failed; nothing was applied.
    #[error("Transaction rejected: {0:?}")]
    ConditionFailed(Vec<FailedCondition>),

    /// The storage engine is temporarily unavailable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within the allowed time.
    ///
    /// The write may or may not have been applied.
    #[error("Store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// An unexpected internal error occurred.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// True when retrying the same operation may succeed.
    ///
    /// Condition failures are deterministic against the observed state and
    /// are never transient.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Errors that can occur during order operations.
///
/// `OrderError` is the single taxonomy surfaced by the order service. The
/// kinds map onto caller behavior:
///
/// - **`Validation`**: fix the input and resubmit
/// - **`ProductNotFound`** / **`InsufficientInventory`**: adjust the cart
/// - **`DuplicateOrderMismatch`**: pick a fresh order id
/// - **`InventoryConflict`**: a racing order won; re-validate and resubmit
/// - **`InvalidTransition`** / **`MissingTrackingNumber`**: caller bug or
///   stale view of the order lifecycle
/// - **`TransitionConflict`**: concurrent status update; re-read and retry
/// - **`ServiceUnavailable`**: retries exhausted, back off and try later
/// - **`Store`**: unexpected engine failure, log and investigate
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    /// The request failed input validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A requested product does not exist in the catalog.
    #[error("Product not found: {product_id}")]
    ProductNotFound {
        /// The unknown product identifier
        product_id: ProductId,
    },

    /// The advisory availability check found too little stock.
    #[error("Insufficient inventory for product '{product_id}': requested {requested}, available {available}")]
    InsufficientInventory {
        /// The product with insufficient stock
        product_id: ProductId,
        /// The quantity requested across the order
        requested: u32,
        /// The quantity available at check time
        available: u32,
    },

    /// An order with this id exists but with different contents.
    #[error("Order '{order_id}' already exists with different contents")]
    DuplicateOrderMismatch {
        /// The conflicting order identifier
        order_id: OrderId,
    },

    /// A concurrent order consumed the stock between validation and commit.
    #[error("Inventory conflict on products: {product_ids:?}")]
    InventoryConflict {
        /// The products whose stock conditions failed
        product_ids: Vec<ProductId>,
    },

    /// The requested order does not exist.
    #[error("Order not found: {order_id}")]
    NotFound {
        /// The missing order identifier
        order_id: OrderId,
    },

    /// The requested status change is not permitted by the lifecycle.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The order's current status
        from: OrderStatus,
        /// The requested status
        to: OrderStatus,
    },

    /// Marking an order shipped requires a tracking number.
    #[error("A tracking number is required to mark an order shipped")]
    MissingTrackingNumber,

    /// A concurrent writer changed the order's status first.
    #[error("Concurrent status update on order '{order_id}'")]
    TransitionConflict {
        /// The contended order identifier
        order_id: OrderId,
    },

    /// Transient store failures persisted through every retry attempt.
    #[error("Service unavailable after {attempts} attempts")]
    ServiceUnavailable {
        /// How many attempts were made before giving up
        attempts: u32,
    },

    /// An unexpected storage failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl OrderError {
    /// True when the caller may retry the same request and plausibly succeed.
    ///
    /// `InventoryConflict` and `TransitionConflict` need a re-read or
    /// re-validation first; `ServiceUnavailable` needs a backoff.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InventoryConflict { .. }
                | Self::TransitionConflict { .. }
                | Self::ServiceUnavailable { .. }
        )
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConditionFailed(conditions)
                if conditions
                    .iter()
                    .all(|c| matches!(c, FailedCondition::InsufficientStock { .. })) =>
            {
                let product_ids = conditions
                    .into_iter()
                    .filter_map(|c| match c {
                        FailedCondition::InsufficientStock { product_id, .. } => Some(product_id),
                        _ => None,
                    })
                    .collect();
                Self::InventoryConflict { product_ids }
            }
            other => Self::Store(other),
        }
    }
}

/// Type alias for order operation results.
pub type OrderResult<T> = Result<T, OrderError>;

/// Type alias for storage engine results.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn order_id(s: &str) -> OrderId {
        OrderId::try_new(s).unwrap()
    }

    fn product_id(s: &str) -> ProductId {
        ProductId::try_new(s).unwrap()
    }

    #[test]
    fn validation_error_messages_are_descriptive() {
        let err = ValidationError::EmptyItems;
        assert_eq!(err.to_string(), "An order must contain at least one item");

        let err = ValidationError::InvalidCursor("not base64".to_string());
        assert_eq!(err.to_string(), "Invalid pagination cursor: not base64");
    }

    #[test]
    fn failed_condition_messages_are_descriptive() {
        let cond = FailedCondition::InsufficientStock {
            product_id: product_id("PRD-1"),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            cond.to_string(),
            "Insufficient stock for product 'PRD-1': requested 3, available 1"
        );

        let cond = FailedCondition::OrderAlreadyExists {
            order_id: order_id("ORD-1"),
        };
        assert_eq!(cond.to_string(), "Order 'ORD-1' already exists");
    }

    #[test]
    fn store_error_transience_classification() {
        assert!(StoreError::Unavailable("down".to_string()).is_transient());
        assert!(StoreError::Timeout(std::time::Duration::from_secs(5)).is_transient());
        assert!(!StoreError::ConditionFailed(vec![]).is_transient());
        assert!(!StoreError::Internal("bug".to_string()).is_transient());
    }

    #[test]
    fn order_error_retryability_classification() {
        let err = OrderError::InventoryConflict {
            product_ids: vec![product_id("PRD-1")],
        };
        assert!(err.is_retryable());

        let err = OrderError::ServiceUnavailable { attempts: 3 };
        assert!(err.is_retryable());

        let err = OrderError::DuplicateOrderMismatch {
            order_id: order_id("ORD-1"),
        };
        assert!(!err.is_retryable());

        let err = OrderError::Validation(ValidationError::EmptyItems);
        assert!(!err.is_retryable());
    }

    #[test]
    fn insufficient_stock_conditions_convert_to_inventory_conflict() {
        let store_err = StoreError::ConditionFailed(vec![
            FailedCondition::InsufficientStock {
                product_id: product_id("PRD-A"),
                requested: 2,
                available: 0,
            },
            FailedCondition::InsufficientStock {
                product_id: product_id("PRD-B"),
                requested: 1,
                available: 0,
            },
        ]);
        let order_err: OrderError = store_err.into();

        match order_err {
            OrderError::InventoryConflict { product_ids } => {
                assert_eq!(product_ids, vec![product_id("PRD-A"), product_id("PRD-B")]);
            }
            other => panic!("Expected InventoryConflict, got {other:?}"),
        }
    }

    #[test]
    fn mixed_condition_failures_pass_through_as_store_errors() {
        let store_err = StoreError::ConditionFailed(vec![
            FailedCondition::OrderAlreadyExists {
                order_id: order_id("ORD-1"),
            },
            FailedCondition::InsufficientStock {
                product_id: product_id("PRD-A"),
                requested: 2,
                available: 0,
            },
        ]);
        let order_err: OrderError = store_err.into();
        assert!(matches!(order_err, OrderError::Store(_)));
    }

    #[test]
    fn transient_store_errors_pass_through_as_store_errors() {
        let order_err: OrderError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(
            order_err,
            OrderError::Store(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn nutype_errors_convert_to_validation_errors() {
        let err = OrderId::try_new("").unwrap_err();
        let validation: ValidationError = err.into();
        assert!(matches!(validation, ValidationError::InvalidOrderId(_)));

        let err = crate::types::Quantity::try_new(0).unwrap_err();
        let validation: ValidationError = err.into();
        assert!(matches!(validation, ValidationError::InvalidQuantity(_)));
    }

    #[test]
    fn result_type_aliases_work() {
        fn order_fn() -> OrderResult<()> {
            Err(OrderError::MissingTrackingNumber)
        }

        #[allow(clippy::unnecessary_wraps)]
        fn store_fn() -> StoreResult<()> {
            Ok(())
        }

        assert!(order_fn().is_err());
        assert!(store_fn().is_ok());
    }
}
