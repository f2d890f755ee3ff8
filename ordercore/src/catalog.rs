//! Product catalog interface.

use crate::errors::StoreResult;
use crate::types::{Money, ProductId};
use async_trait::async_trait;

/// Catalog data needed to validate and price an order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    /// Display title, snapshotted onto order lines
    pub title: String,
    /// Current unit price
    pub unit_price: Money,
}

impl ProductInfo {
    /// Creates a catalog entry.
    pub fn new(title: impl Into<String>, unit_price: Money) -> Self {
        Self {
            title: title.into(),
            unit_price,
        }
    }
}

/// Read-only product lookup used during validation.
///
/// The engine treats the catalog as an external collaborator: it reads
/// titles and prices at validation time and never writes back. Prices read
/// here are frozen onto order lines; later catalog changes never affect a
/// committed order.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product; `None` when the catalog has no such product.
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<ProductInfo>>;
}
