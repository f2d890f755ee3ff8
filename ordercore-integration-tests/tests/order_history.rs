//! Order history pagination through the service façade: every order shows
//! up exactly once across pages, newest first, continued by opaque cursors
//! and never accompanied by a total count.

use ordercore::catalog::ProductInfo;
use ordercore::errors::{OrderError, ValidationError};
use ordercore::order::OrderStatus;
use ordercore::service::{CreateOrderRequest, OrderService};
use ordercore::types::{Money, OrderId, PageSize, ProductId, Quantity, UserId};
use ordercore::validation::RequestedItem;
use ordercore_memory::{InMemoryCartStore, InMemoryCommerceStore, InMemoryProductCatalog};
use std::sync::Arc;
use std::time::Duration;

type Service = OrderService<InMemoryCommerceStore, InMemoryProductCatalog, InMemoryCartStore>;

fn pid(s: &str) -> ProductId {
    ProductId::try_new(s).unwrap()
}

fn uid(s: &str) -> UserId {
    UserId::try_new(s).unwrap()
}

/// Seeds `count` orders for `user`, oldest first, with distinct creation
/// timestamps.
async fn seeded_service(user: &str, count: usize) -> Service {
    let store = Arc::new(InMemoryCommerceStore::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());
    let cart = Arc::new(InMemoryCartStore::new());
    store.set_stock(pid("PRD-A"), 1000);
    catalog.insert_product(
        pid("PRD-A"),
        ProductInfo::new("Widget", Money::from_cents(1000).unwrap()),
    );
    let service = OrderService::new(store, catalog, cart);

    for n in 1..=count {
        service
            .create_order(CreateOrderRequest {
                order_id: OrderId::try_new(format!("ORD-{user}-{n}")).unwrap(),
                user_id: uid(user),
                items: vec![RequestedItem::new(
                    pid("PRD-A"),
                    Quantity::try_new(1).unwrap(),
                )],
                destination: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    service
}

#[tokio::test]
async fn pages_cover_every_order_exactly_once_newest_first() {
    let service = seeded_service("user-1", 7).await;
    let size = PageSize::try_new(3).unwrap();

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = service
            .list_orders(&uid("user-1"), cursor.as_deref(), Some(size), None)
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
    assert_eq!(
        seen,
        vec![
            "ORD-user-1-7",
            "ORD-user-1-6",
            "ORD-user-1-5",
            "ORD-user-1-4",
            "ORD-user-1-3",
            "ORD-user-1-2",
            "ORD-user-1-1",
        ]
    );
}

#[tokio::test]
async fn large_histories_page_cleanly_with_a_short_final_page() {
    let service = seeded_service("user-1", 25).await;
    let size = PageSize::try_new(10).unwrap();

    let mut page_sizes = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = service
            .list_orders(&uid("user-1"), cursor.as_deref(), Some(size), None)
            .await
            .unwrap();
        page_sizes.push(page.orders.len());
        for order in &page.orders {
            assert!(
                seen.insert(order.order_id().clone()),
                "order {} appeared twice",
                order.order_id()
            );
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(page_sizes, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn listing_is_scoped_to_the_requested_user() {
    let service = seeded_service("user-1", 3).await;

    let page = service
        .list_orders(&uid("user-2"), None, None, None)
        .await
        .unwrap();
    assert!(page.orders.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn default_page_size_returns_small_histories_in_one_page() {
    let service = seeded_service("user-1", 7).await;

    let page = service
        .list_orders(&uid("user-1"), None, None, None)
        .await
        .unwrap();
    assert_eq!(page.orders.len(), 7);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn status_filter_combines_with_pagination() {
    let service = seeded_service("user-1", 5).await;
    for n in [2, 4] {
        service
            .update_status(
                &OrderId::try_new(format!("ORD-user-1-{n}")).unwrap(),
                OrderStatus::Cancelled,
                None,
            )
            .await
            .unwrap();
    }

    let cancelled = service
        .list_orders(
            &uid("user-1"),
            None,
            Some(PageSize::try_new(1).unwrap()),
            Some(OrderStatus::Cancelled),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.orders.len(), 1);
    assert_eq!(cancelled.orders[0].order_id().as_ref(), "ORD-user-1-4");

    let rest = service
        .list_orders(
            &uid("user-1"),
            cancelled.next_cursor.as_deref(),
            Some(PageSize::try_new(1).unwrap()),
            Some(OrderStatus::Cancelled),
        )
        .await
        .unwrap();
    assert_eq!(rest.orders.len(), 1);
    assert_eq!(rest.orders[0].order_id().as_ref(), "ORD-user-1-2");
}

#[tokio::test]
async fn tampered_cursors_are_rejected_as_validation_errors() {
    let service = seeded_service("user-1", 2).await;

    let err = service
        .list_orders(&uid("user-1"), Some("definitely*not*a*cursor"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::InvalidCursor(_))
    ));
}
