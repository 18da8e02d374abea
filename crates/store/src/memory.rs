use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::CustomerId;
use domain::{Order, OrderStatus};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Notification, NotificationId, OrderId, Product, ProductId, Result, StockLevel, StoreError,
    VendorId, Version,
    store::{NotificationStore, OrderStore, ProductStore, StockTransaction},
};

type ProductSlot = Arc<Mutex<Product>>;

/// In-memory store implementation for tests and single-process runs.
///
/// Each product sits behind its own mutex, which is the per-product
/// serialization point for every stock change. The outer map lock is only
/// held long enough to look up a slot.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<HashMap<ProductId, ProductSlot>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock of a product, if it exists.
    pub async fn stock_of(&self, product_id: &ProductId) -> Option<i64> {
        let slot = self.slot(product_id).await?;
        let product = slot.lock().await;
        Some(product.stock)
    }

    async fn slot(&self, product_id: &ProductId) -> Option<ProductSlot> {
        self.products.read().await.get(product_id).cloned()
    }

    fn sorted_by_creation(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_uuid().cmp(&b.id().as_uuid()))
        });
        orders
    }

    async fn filtered_orders(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let orders = self.orders.read().await;
        Self::sorted_by_creation(orders.values().filter(|&o| keep(o)).cloned().collect())
    }
}

/// Version an order write produces, given the stored version (if any) and
/// the version the writer expects (`None` for an insert).
fn checked_order_version(
    order_id: OrderId,
    current: Option<Version>,
    expected: Option<Version>,
) -> Result<Version> {
    match (expected, current) {
        (None, None) => Ok(Version::first()),
        (None, Some(_)) => Err(StoreError::DuplicateOrder(order_id)),
        (Some(_), None) => Err(StoreError::OrderNotFound(order_id)),
        (Some(expected), Some(actual)) if expected == actual => Ok(expected.next()),
        (Some(expected), Some(actual)) => Err(StoreError::ConcurrencyConflict {
            order_id,
            expected,
            actual,
        }),
    }
}

/// Writes an order into the map after checking its version.
fn write_order(
    orders: &mut HashMap<OrderId, Order>,
    order: &Order,
    expected: Option<Version>,
) -> Result<Version> {
    let current = orders.get(&order.id()).map(Order::version);
    let version = checked_order_version(order.id(), current, expected)?;
    let mut stored = order.clone();
    stored.set_version(version);
    orders.insert(order.id(), stored);
    Ok(version)
}

/// Applies a conditional delta to a locked product.
fn apply_delta(product: &mut Product, delta: i64) -> Result<StockLevel> {
    let new_stock = product
        .stock
        .checked_add(delta)
        .ok_or_else(|| StoreError::StockOverflow {
            product_id: product.id.clone(),
            delta,
        })?;
    if new_stock < 0 {
        return Err(StoreError::InsufficientStock {
            product_id: product.id.clone(),
            requested: -delta,
            available: product.stock,
        });
    }
    product.stock = new_stock;
    Ok(product.stock_level())
}

#[async_trait]
impl ProductStore for InMemoryStore {
    type Transaction = InMemoryStockTransaction;

    async fn insert_product(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(StoreError::DuplicateProduct(product.id));
        }
        products.insert(product.id.clone(), Arc::new(Mutex::new(product)));
        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        match self.slot(product_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let slots: Vec<ProductSlot> = self.products.read().await.values().cloned().collect();
        let mut products = Vec::with_capacity(slots.len());
        for slot in slots {
            products.push(slot.lock().await.clone());
        }
        products.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(products)
    }

    async fn try_adjust(&self, product_id: &ProductId, delta: i64) -> Result<StockLevel> {
        let slot = self
            .slot(product_id)
            .await
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        let mut product = slot.lock().await;
        apply_delta(&mut product, delta)
    }

    async fn begin(&self, product_ids: &[ProductId]) -> Result<Self::Transaction> {
        let mut ids: Vec<&ProductId> = product_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let mut slots = Vec::with_capacity(ids.len());
        {
            let products = self.products.read().await;
            for id in ids {
                if let Some(slot) = products.get(id) {
                    slots.push((id.clone(), slot.clone()));
                }
            }
        }

        // Ascending id order is the global lock order.
        let mut guards = BTreeMap::new();
        for (id, slot) in slots {
            guards.insert(id, slot.lock_owned().await);
        }

        Ok(InMemoryStockTransaction {
            store: self.clone(),
            guards,
            journal: Vec::new(),
            staged: Vec::new(),
            finished: false,
        })
    }
}

/// An order write held back until commit.
struct StagedOrder {
    /// The record as it will be stored, carrying its new version.
    order: Order,
    /// `None` for an insert.
    expected: Option<Version>,
}

/// Stock transaction over [`InMemoryStore`].
///
/// Adjustments are applied directly to the locked products and journaled.
/// Nobody else can observe them until the guards are released, and a
/// rollback (explicit or on drop) replays the journal in reverse first.
/// Order writes are staged and land in the order map at commit, while the
/// product locks are still held.
pub struct InMemoryStockTransaction {
    store: InMemoryStore,
    guards: BTreeMap<ProductId, OwnedMutexGuard<Product>>,
    journal: Vec<(ProductId, i64)>,
    staged: Vec<StagedOrder>,
    finished: bool,
}

impl InMemoryStockTransaction {
    /// Products locked by this transaction, in lock order.
    pub fn locked_products(&self) -> impl Iterator<Item = &ProductId> {
        self.guards.keys()
    }

    fn revert(&mut self) {
        while let Some((product_id, delta)) = self.journal.pop() {
            if let Some(product) = self.guards.get_mut(&product_id) {
                product.stock -= delta;
            }
        }
        self.staged.clear();
        self.finished = true;
    }

    /// Latest version of an order as seen from inside this transaction.
    async fn visible_version(&self, order_id: OrderId) -> Option<Version> {
        match self.staged.iter().rev().find(|s| s.order.id() == order_id) {
            Some(staged) => Some(staged.order.version()),
            None => self
                .store
                .orders
                .read()
                .await
                .get(&order_id)
                .map(Order::version),
        }
    }

    async fn stage(&mut self, order: &Order, expected: Option<Version>) -> Result<Version> {
        let current = self.visible_version(order.id()).await;
        let version = checked_order_version(order.id(), current, expected)?;

        let mut stored = order.clone();
        stored.set_version(version);
        self.staged.push(StagedOrder {
            order: stored,
            expected,
        });
        Ok(version)
    }

    /// Applies every staged write, or none if one no longer fits the map.
    fn apply_staged(&mut self, orders: &mut HashMap<OrderId, Order>) -> Result<()> {
        let mut seen: HashMap<OrderId, Version> = HashMap::new();
        for staged in &self.staged {
            let order_id = staged.order.id();
            let current = seen
                .get(&order_id)
                .copied()
                .or_else(|| orders.get(&order_id).map(Order::version));
            checked_order_version(order_id, current, staged.expected)?;
            seen.insert(order_id, staged.order.version());
        }

        for staged in self.staged.drain(..) {
            orders.insert(staged.order.id(), staged.order);
        }
        Ok(())
    }
}

#[async_trait]
impl StockTransaction for InMemoryStockTransaction {
    async fn adjust(&mut self, product_id: &ProductId, delta: i64) -> Result<StockLevel> {
        let Some(product) = self.guards.get_mut(product_id) else {
            return Err(match self.store.slot(product_id).await {
                Some(_) => StoreError::ProductNotLocked(product_id.clone()),
                None => StoreError::ProductNotFound(product_id.clone()),
            });
        };

        let level = apply_delta(product, delta)?;
        self.journal.push((product_id.clone(), delta));
        Ok(level)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<Version> {
        self.stage(order, None).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<Version> {
        self.stage(order, Some(order.version())).await
    }

    async fn commit(mut self) -> Result<()> {
        if !self.staged.is_empty() {
            let map = self.store.orders.clone();
            let mut orders = map.write().await;
            if let Err(e) = self.apply_staged(&mut orders) {
                drop(orders);
                self.revert();
                return Err(e);
            }
        }
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.revert();
        Ok(())
    }
}

impl Drop for InMemoryStockTransaction {
    fn drop(&mut self) {
        if !self.finished && !(self.journal.is_empty() && self.staged.is_empty()) {
            tracing::warn!(
                adjustments = self.journal.len(),
                order_writes = self.staged.len(),
                "stock transaction dropped without commit, rolling back"
            );
            self.revert();
        }
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<Version> {
        write_order(&mut *self.orders.write().await, order, None)
    }

    async fn update_order(&self, order: &Order) -> Result<Version> {
        write_order(&mut *self.orders.write().await, order, Some(order.version()))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.filtered_orders(|_| true).await)
    }

    async fn orders_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Order>> {
        Ok(self.filtered_orders(|o| o.involves_vendor(vendor_id)).await)
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        Ok(self
            .filtered_orders(|o| o.customer_id() == customer_id)
            .await)
    }

    async fn has_pending_orders(&self, product_id: &ProductId) -> Result<bool> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .any(|o| o.status() == OrderStatus::Pending && o.contains_product(product_id)))
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn save_notification(&self, notification: Notification) -> Result<()> {
        self.notifications.write().await.push(notification);
        Ok(())
    }

    async fn notifications_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| &n.vendor_id == vendor_id)
            .cloned()
            .collect())
    }

    async fn all_notifications(&self) -> Result<Vec<Notification>> {
        Ok(self.notifications.read().await.clone())
    }

    async fn mark_notification_read(&self, notification_id: NotificationId) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or(StoreError::NotificationNotFound(notification_id))?;
        notification.is_read = true;
        Ok(())
    }
}
