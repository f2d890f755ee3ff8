//! Advisory validation of requested order items.
//!
//! The validator resolves each requested line against the catalog, freezes
//! the unit price and title, and checks availability so that obviously
//! doomed requests fail before any write is attempted. The check is
//! advisory only: the conditional decrements at commit time are the sole
//! authority on stock, and passing validation never reserves anything.
//!
//! Unlike a silent line-skip, every rejected line fails the whole request
//! with enough detail for the caller to fix it.

use crate::catalog::ProductCatalog;
use crate::errors::{OrderError, OrderResult, ValidationError};
use crate::order::OrderItem;
use crate::store::CommerceStore;
use crate::types::{ProductId, Quantity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A single order line as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedItem {
    /// The product to order
    pub product_id: ProductId,
    /// How many units this line requests
    pub quantity: Quantity,
}

impl RequestedItem {
    /// Creates a requested line.
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Validates requested items against catalog and inventory.
#[derive(Debug, Clone)]
pub struct OrderItemValidator<S, C> {
    store: Arc<S>,
    catalog: Arc<C>,
}

impl<S, C> OrderItemValidator<S, C>
where
    S: CommerceStore,
    C: ProductCatalog,
{
    /// Creates a validator over the given store and catalog.
    pub fn new(store: Arc<S>, catalog: Arc<C>) -> Self {
        Self { store, catalog }
    }

    /// Resolves and checks the requested lines.
    ///
    /// Returns fully priced line items with unit price and title frozen at
    /// validation time, preserving submitted line order (including repeated
    /// products). Fails fast on the first unknown product, then on the
    /// first product whose aggregated requested quantity exceeds current
    /// availability. Read-only; performs no reservation.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn validate(&self, items: &[RequestedItem]) -> OrderResult<Vec<OrderItem>> {
        if items.is_empty() {
            return Err(ValidationError::EmptyItems.into());
        }

        // Resolve catalog entries in line order, freezing price and title.
        let mut validated = Vec::with_capacity(items.len());
        for item in items {
            let product = self
                .catalog
                .get_product(&item.product_id)
                .await
                .map_err(OrderError::from)?
                .ok_or_else(|| OrderError::ProductNotFound {
                    product_id: item.product_id.clone(),
                })?;

            validated.push(
                OrderItem::new(
                    item.product_id.clone(),
                    product.title,
                    item.quantity,
                    product.unit_price,
                )
                .map_err(OrderError::from)?,
            );
        }

        // Advisory stock check against aggregated quantities, so repeated
        // lines for one product are counted together just as the commit
        // will count them.
        let mut totals: Vec<(ProductId, u32)> = Vec::new();
        let mut index: HashMap<ProductId, usize> = HashMap::new();
        for item in items {
            if let Some(&i) = index.get(&item.product_id) {
                totals[i].1 = totals[i].1.saturating_add(item.quantity.value());
            } else {
                index.insert(item.product_id.clone(), totals.len());
                totals.push((item.product_id.clone(), item.quantity.value()));
            }
        }

        for (product_id, requested) in totals {
            let available = self
                .store
                .available_quantity(&product_id)
                .await
                .map_err(OrderError::from)?;
            if available < requested {
                return Err(OrderError::InsufficientInventory {
                    product_id,
                    requested,
                    available,
                });
            }
        }

        debug!("Validated {} line(s)", validated.len());
        Ok(validated)
    }
}
