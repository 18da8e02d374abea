//! Order service orchestrating stock reservations, the order record and
//! vendor notifications.

use chrono::Utc;
use common::{CustomerId, NotificationId, OrderId, ProductId, VendorId};
use domain::{CancelOrder, CreateOrder, Order, OrderStatus, SetItemReadiness, UpdateOrderStatus};
use inventory::{ReservationCoordinator, StockLedger};
use store::{MarketplaceStore, Notification, Product, StockLevel};

use crate::error::{OrderServiceError, Result};
use crate::locks::OrderLocks;
use crate::notifier::{NotificationSink, StoreNotificationSink, low_stock_message};
use crate::product::RegisterProduct;

/// Service for placing, cancelling and advancing orders.
///
/// Every operation on one order runs under that order's in-process lock,
/// and every write is checked against the stored version, so concurrent
/// requests for the same order are applied one at a time or rejected.
pub struct OrderService<S, N = StoreNotificationSink<S>> {
    store: S,
    ledger: StockLedger<S>,
    reservations: ReservationCoordinator<S>,
    notifier: N,
    locks: OrderLocks,
}

impl<S: MarketplaceStore> OrderService<S> {
    /// Creates a service that records notifications in the same store.
    pub fn new(store: S) -> Self {
        let notifier = StoreNotificationSink::new(store.clone());
        Self::with_sink(store, notifier)
    }
}

impl<S, N> OrderService<S, N>
where
    S: MarketplaceStore,
    N: NotificationSink,
{
    pub fn with_sink(store: S, notifier: N) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            reservations: ReservationCoordinator::new(store.clone()),
            store,
            notifier,
            locks: OrderLocks::new(),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // Order commands

    /// Places an order, reserving stock for every line item.
    ///
    /// Either the whole order is reserved and persisted as `Pending`, or
    /// nothing changes.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, customer_id = %cmd.customer_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        let mut order = Order::place(cmd)?;

        let mut reservation = self.reservations.reserve(order.items()).await?;

        let version = match reservation.insert_order(&order).await {
            Ok(version) => version,
            Err(e) => {
                if let Err(rollback_err) = reservation.rollback().await {
                    tracing::error!(error = %rollback_err, "failed to roll back reservation");
                }
                return Err(e.into());
            }
        };

        let low_stock: Vec<StockLevel> = reservation.low_stock().cloned().collect();

        if let Err(e) = reservation.commit().await {
            tracing::error!(error = %e, "order commit failed");
            return Err(OrderServiceError::TransactionAborted(e.to_string()));
        }

        order.set_version(version);
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(total = %order.total_amount(), items = order.items().len(), "order created");

        self.alert_low_stock(&low_stock).await;

        Ok(order)
    }

    /// Cancels an order and returns its stock.
    ///
    /// Stock is released exactly once: a second cancellation fails with
    /// `AlreadyCancelled` and leaves stock untouched.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<Order> {
        let order_id = cmd.order_id;
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        let previous_status = order.status();
        order
            .cancel(cmd.cancellation_note)
            .map_err(|e| OrderServiceError::from_order(order_id, e))?;

        let mut release = self.reservations.release(order.items()).await?;

        let version = match release.update_order(&order).await {
            Ok(version) => version,
            Err(e) => {
                if let Err(rollback_err) = release.rollback().await {
                    tracing::error!(error = %rollback_err, "failed to roll back release");
                }
                return Err(e.into());
            }
        };

        if let Err(e) = release.commit().await {
            tracing::error!(error = %e, "cancellation commit failed");
            return Err(OrderServiceError::TransactionAborted(e.to_string()));
        }

        order.set_version(version);
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%previous_status, "order cancelled");

        Ok(order)
    }

    /// Applies a status-update request and returns the resulting status.
    ///
    /// The requested status is a hint: except for the dispatch and delivery
    /// overrides, the new status is derived from item readiness.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, requested = %cmd.status))]
    pub async fn update_status(&self, cmd: UpdateOrderStatus) -> Result<OrderStatus> {
        let order_id = cmd.order_id;
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        let before = order.status();

        let after = order
            .apply_status_request(cmd.status, cmd.vendor_id.as_ref())
            .map_err(|e| OrderServiceError::from_order(order_id, e))?;

        if after != before {
            self.store.update_order(&order).await?;
            metrics::counter!("order_status_updates_total", "status" => after.as_str())
                .increment(1);
            tracing::info!(from = %before, to = %after, "order status changed");
        } else {
            tracing::debug!(status = %after, "order status unchanged");
        }

        Ok(after)
    }

    /// Flags one of a vendor's items as ready or not ready.
    #[tracing::instrument(
        skip(self, cmd),
        fields(order_id = %cmd.order_id, product_id = %cmd.product_id, vendor_id = %cmd.vendor_id)
    )]
    pub async fn set_item_readiness(&self, cmd: SetItemReadiness) -> Result<Order> {
        let order_id = cmd.order_id;
        let _guard = self.locks.lock(order_id).await;

        let mut order = self.load(order_id).await?;
        order
            .set_item_ready(&cmd.product_id, &cmd.vendor_id, cmd.is_ready)
            .map_err(|e| OrderServiceError::from_order(order_id, e))?;

        let version = self.store.update_order(&order).await?;
        order.set_version(version);

        Ok(order)
    }

    // Order queries

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    pub async fn orders_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_vendor(vendor_id).await?)
    }

    pub async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_customer(customer_id).await?)
    }

    /// True if a `Pending` order still contains the product.
    pub async fn has_pending_orders(&self, product_id: &ProductId) -> Result<bool> {
        Ok(self.store.has_pending_orders(product_id).await?)
    }

    // Products

    #[tracing::instrument(skip(self, cmd), fields(vendor_id = %cmd.vendor_id))]
    pub async fn register_product(&self, cmd: RegisterProduct) -> Result<Product> {
        cmd.validate()?;

        let product = Product::new(
            cmd.product_id.unwrap_or_else(ProductId::generate),
            cmd.vendor_id,
            cmd.name,
            cmd.unit_price,
            cmd.stock,
        );
        self.store.insert_product(product.clone()).await?;

        tracing::info!(product_id = %product.id, stock = product.stock, "product registered");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| OrderServiceError::ProductNotFound(product_id.clone()))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    /// Adds `quantity` units to a product's stock.
    pub async fn restock(&self, product_id: &ProductId, quantity: i64) -> Result<StockLevel> {
        Ok(self.ledger.restock(product_id, quantity).await?)
    }

    // Notifications

    pub async fn notifications_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Notification>> {
        Ok(self.store.notifications_for_vendor(vendor_id).await?)
    }

    pub async fn all_notifications(&self) -> Result<Vec<Notification>> {
        Ok(self.store.all_notifications().await?)
    }

    pub async fn mark_notification_read(&self, notification_id: NotificationId) -> Result<()> {
        Ok(self.store.mark_notification_read(notification_id).await?)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))
    }

    async fn alert_low_stock(&self, levels: &[StockLevel]) {
        for level in levels {
            metrics::counter!("low_stock_alerts_total").increment(1);
            tracing::info!(
                product_id = %level.product_id,
                vendor_id = %level.vendor_id,
                remaining = level.quantity,
                "low stock"
            );

            let message = low_stock_message(&level.product_id, level.quantity);
            if let Err(e) = self
                .notifier
                .notify(&level.vendor_id, message, Utc::now())
                .await
            {
                tracing::warn!(
                    product_id = %level.product_id,
                    vendor_id = %level.vendor_id,
                    error = %e,
                    "failed to send low-stock notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, OrderLineItem};
    use store::InMemoryStore;

    async fn service_with(products: &[(&str, &str, i64)]) -> OrderService<InMemoryStore> {
        let service = OrderService::new(InMemoryStore::new());
        for (id, vendor, stock) in products {
            service
                .register_product(
                    RegisterProduct::new(*vendor, format!("Product {id}"), Money::from_cents(1000), *stock)
                        .with_id(*id),
                )
                .await
                .unwrap();
        }
        service
    }

    fn line(product: &str, vendor: &str, quantity: u32) -> OrderLineItem {
        OrderLineItem::new(product, vendor, format!("Product {product}"), quantity, Money::from_cents(1000))
    }

    fn place(customer_id: CustomerId, items: Vec<OrderLineItem>) -> CreateOrder {
        CreateOrder::new(customer_id, "1 Main Street", items)
    }

    #[tokio::test]
    async fn test_register_and_restock_product() {
        let service = service_with(&[]).await;

        let product = service
            .register_product(RegisterProduct::new("V1", "Widget", Money::from_cents(250), 3))
            .await
            .unwrap();
        assert!(!product.id.as_str().is_empty());

        let level = service.restock(&product.id, 7).await.unwrap();
        assert_eq!(level.quantity, 10);

        let fetched = service.get_product(&product.id).await.unwrap();
        assert_eq!(fetched.stock, 10);
        assert_eq!(service.list_products().await.unwrap().len(), 1);

        assert!(matches!(
            service.restock(&product.id, 0).await,
            Err(OrderServiceError::Validation(_))
        ));
        assert!(matches!(
            service.get_product(&ProductId::new("missing")).await,
            Err(OrderServiceError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_product_id_is_validation_error() {
        let service = service_with(&[("A", "V1", 1)]).await;

        let result = service
            .register_product(RegisterProduct::new("V1", "Again", Money::zero(), 1).with_id("A"))
            .await;
        assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_validates_before_touching_stock() {
        let service = service_with(&[("A", "V1", 5)]).await;

        let empty = service.create_order(place(CustomerId::new(), vec![])).await;
        assert!(matches!(empty, Err(OrderServiceError::Validation(_))));

        let zero = service
            .create_order(place(CustomerId::new(), vec![line("A", "V1", 0)]))
            .await;
        assert!(matches!(zero, Err(OrderServiceError::Validation(_))));

        assert_eq!(service.get_product(&ProductId::new("A")).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_vendor_mismatch_is_rejected() {
        let service = service_with(&[("A", "V1", 5)]).await;

        let result = service
            .create_order(place(CustomerId::new(), vec![line("A", "V2", 1)]))
            .await;

        assert!(matches!(result, Err(OrderServiceError::Validation(_))));
        assert_eq!(service.get_product(&ProductId::new("A")).await.unwrap().stock, 5);
        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let service = service_with(&[]).await;

        let result = service
            .create_order(place(CustomerId::new(), vec![line("GHOST", "V1", 1)]))
            .await;
        assert!(matches!(result, Err(OrderServiceError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_order_queries() {
        let service = service_with(&[("A", "V1", 50), ("B", "V2", 50)]).await;
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        let first = service
            .create_order(place(alice, vec![line("A", "V1", 1), line("B", "V2", 1)]))
            .await
            .unwrap();
        let second = service
            .create_order(place(bob, vec![line("B", "V2", 1)]))
            .await
            .unwrap();

        assert_eq!(service.get_order(first.id()).await.unwrap(), first);
        assert_eq!(service.list_orders().await.unwrap().len(), 2);

        let v1 = service.orders_for_vendor(&VendorId::new("V1")).await.unwrap();
        assert_eq!(v1.len(), 1);
        assert_eq!(v1[0].id(), first.id());

        let bobs = service.orders_for_customer(bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id(), second.id());

        assert!(service.has_pending_orders(&ProductId::new("A")).await.unwrap());

        service
            .update_status(UpdateOrderStatus::new(first.id(), OrderStatus::Processing, None))
            .await
            .unwrap();
        assert!(!service.has_pending_orders(&ProductId::new("A")).await.unwrap());

        assert!(matches!(
            service.get_order(OrderId::new()).await,
            Err(OrderServiceError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_low_stock_creates_vendor_notification() {
        let service = service_with(&[("A", "V1", 6), ("B", "V2", 100)]).await;

        service
            .create_order(place(CustomerId::new(), vec![line("A", "V1", 2), line("B", "V2", 1)]))
            .await
            .unwrap();

        let v1 = service.notifications_for_vendor(&VendorId::new("V1")).await.unwrap();
        assert_eq!(v1.len(), 1);
        assert!(v1[0].message.contains('A'));
        assert!(v1[0].message.contains('4'));

        let v2 = service.notifications_for_vendor(&VendorId::new("V2")).await.unwrap();
        assert!(v2.is_empty());

        service.mark_notification_read(v1[0].id).await.unwrap();
        let all = service.all_notifications().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_read);

        assert!(matches!(
            service.mark_notification_read(NotificationId::new()).await,
            Err(OrderServiceError::NotificationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_update_unchanged_keeps_version() {
        let service = service_with(&[("A", "V1", 10)]).await;
        let order = service
            .create_order(place(CustomerId::new(), vec![line("A", "V1", 1)]))
            .await
            .unwrap();

        // Nothing is ready, so a readiness-driven request leaves the order alone.
        let status = service
            .update_status(UpdateOrderStatus::new(
                order.id(),
                OrderStatus::ReadyForShipment,
                Some(VendorId::new("V1")),
            ))
            .await
            .unwrap();
        assert_eq!(status, OrderStatus::Pending);

        let stored = service.get_order(order.id()).await.unwrap();
        assert_eq!(stored.version(), order.version());
    }
}
