//! Point lookups and order history pagination.
//!
//! History pages are served newest-first and continue through an opaque
//! cursor. The cursor is a URL-safe base64 encoding of the last page key
//! and round-trips through the client untouched; clients never receive
//! total counts, only the next cursor or its absence.

use crate::errors::{OrderError, OrderResult, ValidationError};
use crate::order::{Order, OrderStatus};
use crate::store::{CommerceStore, OrderPageKey, OrderQuery};
use crate::types::{OrderId, PageSize, UserId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One page of a user's order history.
#[derive(Debug, Clone)]
pub struct OrderHistoryPage {
    /// Orders in reverse-chronological creation order.
    pub orders: Vec<Order>,
    /// Cursor for the next page, absent when the history is exhausted.
    pub next_cursor: Option<String>,
}

/// Read-side access to committed orders.
#[derive(Debug, Clone)]
pub struct OrderQueryService<S> {
    store: Arc<S>,
}

impl<S> OrderQueryService<S>
where
    S: CommerceStore,
{
    /// Creates a query service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetches a single order by id.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> OrderResult<Order> {
        self.store
            .get_order(order_id)
            .await
            .map_err(OrderError::from)?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.clone(),
            })
    }

    /// Lists a user's orders, newest first.
    ///
    /// `cursor` is the value returned by a previous page; passing a cursor
    /// this service did not mint is a validation error. `page_size`
    /// defaults to twenty. `status` narrows the page to orders currently
    /// in that state.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn user_orders(
        &self,
        user_id: &UserId,
        cursor: Option<&str>,
        page_size: Option<PageSize>,
        status: Option<OrderStatus>,
    ) -> OrderResult<OrderHistoryPage> {
        let start_after = cursor.map(decode_cursor).transpose()?;
        let mut query = OrderQuery::default().with_limit(page_size.unwrap_or_default());
        if let Some(key) = start_after {
            query = query.starting_after(key);
        }
        if let Some(status) = status {
            query = query.with_status(status);
        }

        let page = self
            .store
            .user_orders(user_id, &query)
            .await
            .map_err(OrderError::from)?;

        debug!("Fetched {} orders for {user_id}", page.orders.len());
        Ok(OrderHistoryPage {
            orders: page.orders,
            next_cursor: page.last_key.as_ref().map(encode_cursor),
        })
    }
}

/// Encodes a page key as an opaque pagination cursor.
fn encode_cursor(key: &OrderPageKey) -> String {
    // Serializing a plain struct with string and timestamp fields cannot fail
    let json = serde_json::to_vec(key).expect("page key serialization should not fail");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes a pagination cursor back to a page key.
fn decode_cursor(cursor: &str) -> Result<OrderPageKey, ValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| ValidationError::InvalidCursor(format!("not valid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::InvalidCursor(format!("not a valid page key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreResult;
    use crate::order::OrderItem;
    use crate::pricing::PriceBreakdown;
    use crate::store::{OrderPage, TransactOp};
    use crate::types::{Money, ProductId, Quantity, Timestamp};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store stub serving pages from a newest-first vector the way the
    /// keyset contract describes.
    struct PagingStore {
        orders: Vec<Order>,
        last_query: Mutex<Option<OrderQuery>>,
    }

    impl PagingStore {
        fn new(orders: Vec<Order>) -> Arc<Self> {
            Arc::new(Self {
                orders,
                last_query: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CommerceStore for PagingStore {
        async fn transact_write(&self, _ops: Vec<TransactOp>) -> StoreResult<()> {
            Ok(())
        }

        async fn get_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
            Ok(self
                .orders
                .iter()
                .find(|o| o.order_id() == order_id)
                .cloned())
        }

        async fn user_orders(
            &self,
            _user_id: &UserId,
            query: &OrderQuery,
        ) -> StoreResult<OrderPage> {
            *self.last_query.lock().unwrap() = Some(query.clone());

            let start = match &query.start_after {
                Some(key) => {
                    self.orders
                        .iter()
                        .position(|o| &OrderPageKey::for_order(o) == key)
                        .map_or(self.orders.len(), |p| p + 1)
                }
                None => 0,
            };
            let matches: Vec<Order> = self.orders[start..]
                .iter()
                .filter(|o| query.status.map_or(true, |s| o.status() == s))
                .cloned()
                .collect();

            let limit = usize::try_from(query.limit.value()).unwrap();
            let orders: Vec<Order> = matches.iter().take(limit).cloned().collect();
            let last_key = if matches.len() > limit {
                orders.last().map(OrderPageKey::for_order)
            } else {
                None
            };
            Ok(OrderPage { orders, last_key })
        }

        async fn available_quantity(&self, _product_id: &ProductId) -> StoreResult<u32> {
            Ok(0)
        }
    }

    fn order(order_id: &str) -> Order {
        let item = OrderItem::new(
            ProductId::try_new("PRD-A").unwrap(),
            "Widget",
            Quantity::try_new(1).unwrap(),
            Money::from_cents(1000).unwrap(),
        )
        .unwrap();
        Order::new(
            OrderId::try_new(order_id).unwrap(),
            UserId::try_new("user-1").unwrap(),
            vec![item],
            PriceBreakdown {
                subtotal: Money::from_cents(1000).unwrap(),
                tax_amount: Money::zero(),
                shipping_amount: Money::zero(),
                total_amount: Money::from_cents(1000).unwrap(),
            },
        )
        .unwrap()
    }

    fn uid() -> UserId {
        UserId::try_new("user-1").unwrap()
    }

    #[tokio::test]
    async fn get_order_returns_the_stored_order() {
        let store = PagingStore::new(vec![order("ORD-1")]);
        let service = OrderQueryService::new(store);

        let found = service
            .get_order(&OrderId::try_new("ORD-1").unwrap())
            .await
            .unwrap();
        assert_eq!(found.order_id().as_ref(), "ORD-1");
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let store = PagingStore::new(vec![]);
        let service = OrderQueryService::new(store);

        let err = service
            .get_order(&OrderId::try_new("ORD-NOPE").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn history_pages_walk_every_order_exactly_once() {
        let orders: Vec<Order> = (1..=5).map(|n| order(&format!("ORD-{n}"))).collect();
        let store = PagingStore::new(orders);
        let service = OrderQueryService::new(store);
        let size = PageSize::try_new(2).unwrap();

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = service
                .user_orders(&uid(), cursor.as_deref(), Some(size), None)
                .await
                .unwrap();
            pages += 1;
            seen.extend(page.orders.iter().map(|o| o.order_id().to_string()));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec!["ORD-1", "ORD-2", "ORD-3", "ORD-4", "ORD-5"]);
    }

    #[tokio::test]
    async fn exact_final_page_ends_without_a_cursor() {
        let orders: Vec<Order> = (1..=4).map(|n| order(&format!("ORD-{n}"))).collect();
        let store = PagingStore::new(orders);
        let service = OrderQueryService::new(store);
        let size = PageSize::try_new(2).unwrap();

        let first = service
            .user_orders(&uid(), None, Some(size), None)
            .await
            .unwrap();
        let second = service
            .user_orders(&uid(), first.next_cursor.as_deref(), Some(size), None)
            .await
            .unwrap();

        assert_eq!(second.orders.len(), 2);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn page_size_defaults_to_twenty() {
        let store = PagingStore::new(vec![order("ORD-1")]);
        let service = OrderQueryService::new(Arc::clone(&store));

        service.user_orders(&uid(), None, None, None).await.unwrap();

        let query = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.limit.value(), 20);
    }

    #[tokio::test]
    async fn status_filter_reaches_the_store() {
        let store = PagingStore::new(vec![order("ORD-1")]);
        let service = OrderQueryService::new(Arc::clone(&store));

        let page = service
            .user_orders(&uid(), None, None, Some(OrderStatus::Cancelled))
            .await
            .unwrap();

        assert!(page.orders.is_empty());
        let query = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.status, Some(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn garbage_cursors_are_validation_errors() {
        let store = PagingStore::new(vec![order("ORD-1")]);
        let service = OrderQueryService::new(store);

        let err = service
            .user_orders(&uid(), Some("!!!not-base64!!!"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::InvalidCursor(_))
        ));

        // Valid base64, but not a page key
        let bogus = URL_SAFE_NO_PAD.encode(b"{\"foo\": 1}");
        let err = service
            .user_orders(&uid(), Some(&bogus), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::InvalidCursor(_))
        ));
    }

    #[test]
    fn cursors_round_trip_page_keys() {
        let key = OrderPageKey {
            created_at: Timestamp::now(),
            order_id: OrderId::try_new("ORD-7").unwrap(),
        };
        let cursor = encode_cursor(&key);
        assert!(!cursor.contains('='), "cursor is unpadded");
        assert_eq!(decode_cursor(&cursor).unwrap(), key);
    }
}
