//! The order aggregate and its lifecycle.
//!
//! `Order` is constructed through a smart constructor that enforces the
//! price-breakdown invariant, so a stored order can never carry totals that
//! disagree with its line items. Status changes flow through
//! [`OrderStatus::can_transition_to`], which encodes the full lifecycle
//! table in one place.

use crate::errors::ValidationError;
use crate::pricing::PriceBreakdown;
use crate::types::{Money, OrderId, ProductId, Quantity, Timestamp, TrackingNumber, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The lifecycle state of an order.
///
/// Orders are born `Confirmed` (creation and payment authorization are one
/// step in this engine). The permitted transitions are:
///
/// ```text
/// confirmed  -> processing | cancelled
/// processing -> shipped    | cancelled
/// shipped    -> delivered
/// ```
///
/// `Delivered` and `Cancelled` are terminal. Serialized lowercase to match
/// the stored representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order committed and inventory reserved.
    Confirmed,
    /// Order is being prepared for shipment.
    Processing,
    /// Order handed to a carrier; tracking number recorded.
    Shipped,
    /// Order received by the customer.
    Delivered,
    /// Order cancelled before shipment.
    Cancelled,
}

impl OrderStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Self-transitions are not permitted.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// True for states with no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A single line of an order.
///
/// `unit_price` and `title` are catalog snapshots taken at validation time;
/// later catalog changes never affect a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product being ordered
    pub product_id: ProductId,
    /// Product title at order time
    pub title: String,
    /// Quantity of the product
    pub quantity: Quantity,
    /// Unit price frozen at order time
    pub unit_price: Money,
    /// `unit_price` × `quantity`
    pub line_subtotal: Money,
}

impl OrderItem {
    /// Creates a line item, computing its subtotal from price and quantity.
    pub fn new(
        product_id: ProductId,
        title: impl Into<String>,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<Self, ValidationError> {
        let line_subtotal = unit_price.multiply_by_quantity(quantity)?;
        Ok(Self {
            product_id,
            title: title.into(),
            quantity,
            unit_price,
            line_subtotal,
        })
    }
}

/// A committed (or about-to-be-committed) customer order.
///
/// Field access is read-only; the only mutation is [`Order::apply_status`],
/// which the storage layer uses when a conditioned status update commits.
/// Construction enforces:
///
/// - at least one line item
/// - `subtotal` equals the sum of line subtotals
/// - `total_amount` equals `subtotal + tax_amount + shipping_amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    total_amount: Money,
    created_at: Timestamp,
    updated_at: Timestamp,
    tracking_number: Option<TrackingNumber>,
}

impl Order {
    /// Creates a new order in the `Confirmed` state.
    ///
    /// The item list preserves the submitted line order, including repeated
    /// products. Rejects an empty item list or a breakdown that does not add
    /// up.
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        breakdown: PriceBreakdown,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }

        let mut line_sum = Money::zero();
        for item in &items {
            line_sum = line_sum.checked_add(item.line_subtotal)?;
        }
        if line_sum != breakdown.subtotal {
            return Err(ValidationError::TotalMismatch {
                expected: line_sum,
                actual: breakdown.subtotal,
            });
        }

        let expected_total = breakdown
            .subtotal
            .checked_add(breakdown.tax_amount)?
            .checked_add(breakdown.shipping_amount)?;
        if expected_total != breakdown.total_amount {
            return Err(ValidationError::TotalMismatch {
                expected: expected_total,
                actual: breakdown.total_amount,
            });
        }

        let now = Timestamp::now();
        Ok(Self {
            order_id,
            user_id,
            status: OrderStatus::Confirmed,
            items,
            subtotal: breakdown.subtotal,
            tax_amount: breakdown.tax_amount,
            shipping_amount: breakdown.shipping_amount,
            total_amount: breakdown.total_amount,
            created_at: now,
            updated_at: now,
            tracking_number: None,
        })
    }

    /// The order identifier.
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// The purchasing user.
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Current lifecycle state.
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// The line items, in submitted order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Sum of line subtotals.
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Tax charged on the subtotal.
    pub const fn tax_amount(&self) -> Money {
        self.tax_amount
    }

    /// Shipping charged for the order.
    pub const fn shipping_amount(&self) -> Money {
        self.shipping_amount
    }

    /// Grand total.
    pub const fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// When the order was created.
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the order last changed.
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Carrier tracking number, present once shipped.
    pub const fn tracking_number(&self) -> Option<&TrackingNumber> {
        self.tracking_number.as_ref()
    }

    /// Total requested quantity per distinct product.
    ///
    /// Repeated product lines are aggregated. This is the view used for
    /// stock decrements and for idempotent-replay comparison.
    pub fn quantities_by_product(&self) -> HashMap<ProductId, u32> {
        let mut quantities: HashMap<ProductId, u32> = HashMap::new();
        for item in &self.items {
            let entry = quantities.entry(item.product_id.clone()).or_insert(0);
            *entry = entry.saturating_add(item.quantity.value());
        }
        quantities
    }

    /// Whether this order represents the same logical request.
    ///
    /// Compares the user and the aggregated product/quantity map, so the
    /// same cart split into different lines still matches. Prices are not
    /// compared: a retried request is the same request even if the catalog
    /// moved underneath it.
    pub fn same_contents(&self, user_id: &UserId, quantities: &HashMap<ProductId, u32>) -> bool {
        self.user_id == *user_id && self.quantities_by_product() == *quantities
    }

    /// Returns a copy with the status applied.
    ///
    /// This is a storage-layer primitive: transition legality and the
    /// tracking-number requirement are enforced by the status machine
    /// before the conditioned write is submitted. A tracking number of
    /// `None` leaves any existing one in place.
    #[must_use]
    pub fn apply_status(
        &self,
        new_status: OrderStatus,
        tracking_number: Option<TrackingNumber>,
        updated_at: Timestamp,
    ) -> Self {
        let mut updated = self.clone();
        updated.status = new_status;
        updated.updated_at = updated_at;
        if tracking_number.is_some() {
            updated.tracking_number = tracking_number;
        }
        updated
    }
}
