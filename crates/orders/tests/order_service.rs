//! End-to-end order flows over the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    CancelOrder, CreateOrder, Money, Order, OrderLineItem, OrderStatus, SetItemReadiness,
    UpdateOrderStatus,
};
use orders::{NotificationSink, OrderService, OrderServiceError, RegisterProduct, SinkError};
use store::{
    CustomerId, InMemoryStockTransaction, InMemoryStore, MarketplaceStore, Notification,
    NotificationId, NotificationStore, OrderId, OrderStore, Product, ProductId, ProductStore,
    StockLevel, StockTransaction, StoreError, VendorId, Version,
};

async fn register<S: MarketplaceStore, N: NotificationSink>(
    service: &OrderService<S, N>,
    products: &[(&str, &str, i64)],
) {
    for (id, vendor, stock) in products {
        service
            .register_product(
                RegisterProduct::new(*vendor, format!("Product {id}"), Money::from_cents(1000), *stock)
                    .with_id(*id),
            )
            .await
            .unwrap();
    }
}

fn line(product: &str, vendor: &str, quantity: u32) -> OrderLineItem {
    OrderLineItem::new(
        product,
        vendor,
        format!("Product {product}"),
        quantity,
        Money::from_cents(1000),
    )
}

fn place(items: Vec<OrderLineItem>) -> CreateOrder {
    CreateOrder::new(CustomerId::new(), "1 Main Street", items)
}

async fn stock<S: MarketplaceStore, N: NotificationSink>(service: &OrderService<S, N>, id: &str) -> i64 {
    service.get_product(&ProductId::new(id)).await.unwrap().stock
}

#[tokio::test]
async fn test_out_of_stock_item_fails_whole_order() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 5), ("B", "V2", 0)]).await;

    let result = service
        .create_order(place(vec![line("A", "V1", 2), line("B", "V2", 1)]))
        .await;

    match result {
        Err(OrderServiceError::InsufficientStock { product_id, .. }) => {
            assert_eq!(product_id, ProductId::new("B"));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(stock(&service, "A").await, 5);
    assert!(service.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_total_overflow_is_rejected() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 5)]).await;

    let result = service
        .create_order(place(vec![OrderLineItem::new(
            "A",
            "V1",
            "Product A",
            2,
            Money::from_cents(i64::MAX),
        )]))
        .await;

    assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    assert_eq!(stock(&service, "A").await, 5);
    assert!(service.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restock_past_max_is_rejected() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 1)]).await;

    let result = service.restock(&ProductId::new("A"), i64::MAX).await;

    assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    assert_eq!(stock(&service, "A").await, 1);
}

#[tokio::test]
async fn test_successful_order_decrements_every_product() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 5), ("C", "V2", 10)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 2), line("C", "V2", 3)]))
        .await
        .unwrap();

    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.version(), Version::first());
    assert_eq!(order.total_amount(), Money::from_cents(5000));
    assert_eq!(stock(&service, "A").await, 3);
    assert_eq!(stock(&service, "C").await, 7);
}

#[tokio::test]
async fn test_cancel_restores_stock_exactly_once() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 5), ("C", "V2", 10)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 2), line("C", "V2", 3)]))
        .await
        .unwrap();
    service
        .update_status(UpdateOrderStatus::new(order.id(), OrderStatus::Processing, None))
        .await
        .unwrap();

    let cancelled = service
        .cancel_order(CancelOrder::new(order.id(), Some("customer request".into())))
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancellation_note(), Some("customer request"));
    assert_eq!(stock(&service, "A").await, 5);
    assert_eq!(stock(&service, "C").await, 10);

    let again = service
        .cancel_order(CancelOrder::new(order.id(), None))
        .await;
    assert!(matches!(again, Err(OrderServiceError::AlreadyCancelled(id)) if id == order.id()));
    assert_eq!(stock(&service, "A").await, 5);
    assert_eq!(stock(&service, "C").await, 10);
}

#[tokio::test]
async fn test_delivered_order_cannot_be_cancelled() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 5)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 1)]))
        .await
        .unwrap();
    service
        .update_status(UpdateOrderStatus::new(order.id(), OrderStatus::Delivered, None))
        .await
        .unwrap();

    let result = service.cancel_order(CancelOrder::new(order.id(), None)).await;
    assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    assert_eq!(stock(&service, "A").await, 4);
}

#[tokio::test]
async fn test_cancel_unknown_order_is_not_found() {
    let service = OrderService::new(InMemoryStore::new());
    let result = service
        .cancel_order(CancelOrder::new(OrderId::new(), None))
        .await;
    assert!(matches!(result, Err(OrderServiceError::OrderNotFound(_))));
}

#[tokio::test]
async fn test_vendor_readiness_drives_fulfillment_status() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 10), ("C", "V1", 10), ("B", "V2", 10)]).await;

    let order = service
        .create_order(place(vec![
            line("A", "V1", 1),
            line("C", "V1", 1),
            line("B", "V2", 1),
        ]))
        .await
        .unwrap();
    let id = order.id();

    let status = service
        .update_status(UpdateOrderStatus::new(id, OrderStatus::Processing, None))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Processing);

    service
        .set_item_readiness(SetItemReadiness::new(id, "A", "V1", true))
        .await
        .unwrap();
    let status = service
        .update_status(UpdateOrderStatus::new(
            id,
            OrderStatus::PartiallyReady,
            Some(VendorId::new("V1")),
        ))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Processing, "C is not ready yet");

    service
        .set_item_readiness(SetItemReadiness::new(id, "C", "V1", true))
        .await
        .unwrap();
    let status = service
        .update_status(UpdateOrderStatus::new(
            id,
            OrderStatus::PartiallyReady,
            Some(VendorId::new("V1")),
        ))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::PartiallyReady);

    service
        .set_item_readiness(SetItemReadiness::new(id, "B", "V2", true))
        .await
        .unwrap();
    let status = service
        .update_status(UpdateOrderStatus::new(
            id,
            OrderStatus::ReadyForShipment,
            Some(VendorId::new("V2")),
        ))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::ReadyForShipment);

    let stored = service.get_order(id).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::ReadyForShipment);
    assert!(stored.items().iter().all(|i| i.is_ready));
}

#[tokio::test]
async fn test_only_owning_vendor_may_flag_items() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 10)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 1)]))
        .await
        .unwrap();

    let result = service
        .set_item_readiness(SetItemReadiness::new(order.id(), "A", "V2", true))
        .await;
    assert!(matches!(result, Err(OrderServiceError::Validation(_))));

    let result = service
        .set_item_readiness(SetItemReadiness::new(order.id(), "Z", "V1", true))
        .await;
    assert!(matches!(result, Err(OrderServiceError::Validation(_))));

    let stored = service.get_order(order.id()).await.unwrap();
    assert!(!stored.items()[0].is_ready);
}

#[tokio::test]
async fn test_cancellation_through_status_update_is_rejected() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 10)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 1)]))
        .await
        .unwrap();

    let result = service
        .update_status(UpdateOrderStatus::new(order.id(), OrderStatus::Cancelled, None))
        .await;
    assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    assert_eq!(stock(&service, "A").await, 9);
}

#[tokio::test]
async fn test_dispatch_override_skips_readiness() {
    let service = OrderService::new(InMemoryStore::new());
    register(&service, &[("A", "V1", 10)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 1)]))
        .await
        .unwrap();

    let status = service
        .update_status(UpdateOrderStatus::new(
            order.id(),
            OrderStatus::OrderDispatched,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::OrderDispatched);

    // Terminal orders stay put.
    service
        .update_status(UpdateOrderStatus::new(order.id(), OrderStatus::Delivered, None))
        .await
        .unwrap();
    let status = service
        .update_status(UpdateOrderStatus::new(order.id(), OrderStatus::Processing, None))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Delivered);
}

// Failure injection

/// Switches for the faults a [`FlakyStore`] injects.
#[derive(Clone, Default)]
struct Faults {
    insert: Arc<AtomicBool>,
    update: Arc<AtomicBool>,
    commit: Arc<AtomicBool>,
}

impl Faults {
    fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    fn on(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }

    fn insert_error(order: &Order) -> StoreError {
        StoreError::DuplicateOrder(order.id())
    }

    fn update_error(order: &Order) -> StoreError {
        StoreError::ConcurrencyConflict {
            order_id: order.id(),
            expected: order.version(),
            actual: order.version().next(),
        }
    }
}

/// Delegates to an [`InMemoryStore`] but can be told to fail order writes
/// or the commit of a unit of work.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: InMemoryStore,
    faults: Faults,
}

/// Unit of work whose order writes and commit obey the store's faults.
struct FlakyTransaction {
    inner: InMemoryStockTransaction,
    faults: Faults,
}

#[async_trait]
impl StockTransaction for FlakyTransaction {
    async fn adjust(&mut self, product_id: &ProductId, delta: i64) -> store::Result<StockLevel> {
        self.inner.adjust(product_id, delta).await
    }

    async fn insert_order(&mut self, order: &Order) -> store::Result<Version> {
        if Faults::on(&self.faults.insert) {
            return Err(Faults::insert_error(order));
        }
        self.inner.insert_order(order).await
    }

    async fn update_order(&mut self, order: &Order) -> store::Result<Version> {
        if Faults::on(&self.faults.update) {
            return Err(Faults::update_error(order));
        }
        self.inner.update_order(order).await
    }

    async fn commit(self) -> store::Result<()> {
        if Faults::on(&self.faults.commit) {
            // The connection dropped at COMMIT: nothing was applied.
            self.inner.rollback().await?;
            return Err(StoreError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset during commit",
            ))));
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> store::Result<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl ProductStore for FlakyStore {
    type Transaction = FlakyTransaction;

    async fn insert_product(&self, product: Product) -> store::Result<()> {
        self.inner.insert_product(product).await
    }

    async fn get_product(&self, product_id: &ProductId) -> store::Result<Option<Product>> {
        self.inner.get_product(product_id).await
    }

    async fn list_products(&self) -> store::Result<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn try_adjust(&self, product_id: &ProductId, delta: i64) -> store::Result<StockLevel> {
        self.inner.try_adjust(product_id, delta).await
    }

    async fn begin(&self, product_ids: &[ProductId]) -> store::Result<Self::Transaction> {
        Ok(FlakyTransaction {
            inner: self.inner.begin(product_ids).await?,
            faults: self.faults.clone(),
        })
    }
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn insert_order(&self, order: &Order) -> store::Result<Version> {
        if Faults::on(&self.faults.insert) {
            return Err(Faults::insert_error(order));
        }
        self.inner.insert_order(order).await
    }

    async fn update_order(&self, order: &Order) -> store::Result<Version> {
        if Faults::on(&self.faults.update) {
            return Err(Faults::update_error(order));
        }
        self.inner.update_order(order).await
    }

    async fn get_order(&self, order_id: OrderId) -> store::Result<Option<Order>> {
        self.inner.get_order(order_id).await
    }

    async fn list_orders(&self) -> store::Result<Vec<Order>> {
        self.inner.list_orders().await
    }

    async fn orders_for_vendor(&self, vendor_id: &VendorId) -> store::Result<Vec<Order>> {
        self.inner.orders_for_vendor(vendor_id).await
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> store::Result<Vec<Order>> {
        self.inner.orders_for_customer(customer_id).await
    }

    async fn has_pending_orders(&self, product_id: &ProductId) -> store::Result<bool> {
        self.inner.has_pending_orders(product_id).await
    }
}

#[async_trait]
impl NotificationStore for FlakyStore {
    async fn save_notification(&self, notification: Notification) -> store::Result<()> {
        self.inner.save_notification(notification).await
    }

    async fn notifications_for_vendor(
        &self,
        vendor_id: &VendorId,
    ) -> store::Result<Vec<Notification>> {
        self.inner.notifications_for_vendor(vendor_id).await
    }

    async fn all_notifications(&self) -> store::Result<Vec<Notification>> {
        self.inner.all_notifications().await
    }

    async fn mark_notification_read(&self, notification_id: NotificationId) -> store::Result<()> {
        self.inner.mark_notification_read(notification_id).await
    }
}

#[tokio::test]
async fn test_failed_order_insert_rolls_back_reservation() {
    let store = FlakyStore::default();
    let service = OrderService::new(store.clone());
    register(&service, &[("A", "V1", 5), ("C", "V2", 10)]).await;

    Faults::set(&store.faults.insert, true);
    let result = service
        .create_order(place(vec![line("A", "V1", 2), line("C", "V2", 3)]))
        .await;

    assert!(matches!(result, Err(OrderServiceError::TransactionAborted(_))));
    assert_eq!(stock(&service, "A").await, 5);
    assert_eq!(stock(&service, "C").await, 10);
    assert!(service.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_create_commit_leaves_nothing_behind() {
    let store = FlakyStore::default();
    let service = OrderService::new(store.clone());
    register(&service, &[("A", "V1", 5)]).await;

    Faults::set(&store.faults.commit, true);
    let result = service.create_order(place(vec![line("A", "V1", 2)])).await;

    assert!(matches!(result, Err(OrderServiceError::TransactionAborted(_))));
    assert_eq!(stock(&service, "A").await, 5);
    assert!(service.list_orders().await.unwrap().is_empty());
    assert!(!service.has_pending_orders(&ProductId::new("A")).await.unwrap());
}

#[tokio::test]
async fn test_failed_cancel_write_keeps_stock_reserved() {
    let store = FlakyStore::default();
    let service = OrderService::new(store.clone());
    register(&service, &[("A", "V1", 5)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 2)]))
        .await
        .unwrap();

    Faults::set(&store.faults.update, true);
    let result = service.cancel_order(CancelOrder::new(order.id(), None)).await;
    assert!(matches!(result, Err(OrderServiceError::TransactionAborted(_))));
    assert_eq!(stock(&service, "A").await, 3);
    assert_eq!(
        service.get_order(order.id()).await.unwrap().status(),
        OrderStatus::Pending
    );

    // Once the store recovers the cancellation goes through exactly once.
    Faults::set(&store.faults.update, false);
    service
        .cancel_order(CancelOrder::new(order.id(), None))
        .await
        .unwrap();
    assert_eq!(stock(&service, "A").await, 5);
}

#[tokio::test]
async fn test_failed_cancel_commit_keeps_order_cancellable() {
    let store = FlakyStore::default();
    let service = OrderService::new(store.clone());
    register(&service, &[("A", "V1", 5)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 2)]))
        .await
        .unwrap();

    Faults::set(&store.faults.commit, true);
    let result = service
        .cancel_order(CancelOrder::new(order.id(), Some("lost at commit".to_string())))
        .await;
    assert!(matches!(result, Err(OrderServiceError::TransactionAborted(_))));

    let stored = service.get_order(order.id()).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Pending);
    assert_eq!(stored.version(), order.version());
    assert_eq!(stock(&service, "A").await, 3);

    Faults::set(&store.faults.commit, false);
    let cancelled = service
        .cancel_order(CancelOrder::new(order.id(), None))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(stock(&service, "A").await, 5);
}

/// Sink that always fails.
struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    async fn notify(
        &self,
        _vendor_id: &VendorId,
        _message: String,
        _at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        Err(SinkError("mailbox full".to_string()))
    }
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_order() {
    let store = InMemoryStore::new();
    let service = OrderService::with_sink(store.clone(), BrokenSink);
    register(&service, &[("A", "V1", 5)]).await;

    let order = service
        .create_order(place(vec![line("A", "V1", 4)]))
        .await
        .unwrap();

    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(stock(&service, "A").await, 1);
    assert!(store.all_notifications().await.unwrap().is_empty());
}
