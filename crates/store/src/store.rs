use async_trait::async_trait;
use common::CustomerId;
use domain::Order;

use crate::{
    Notification, NotificationId, OrderId, Product, ProductId, Result, StockLevel, VendorId,
    Version,
};

/// Unit of work for one order operation: stock adjustments spanning
/// several products plus the write of the order record itself.
///
/// A transaction is opened by [`ProductStore::begin`] and holds the locks of
/// every product it declared until it is committed or rolled back. Nothing
/// it does is visible to others before commit, and dropping an unfinished
/// transaction rolls it back.
#[async_trait]
pub trait StockTransaction: Send {
    /// Adjusts the stock of a locked product.
    ///
    /// A negative delta fails with `InsufficientStock` if it would drive the
    /// quantity below zero; the transaction stays usable after that error.
    async fn adjust(&mut self, product_id: &ProductId, delta: i64) -> Result<StockLevel>;

    /// Inserts a new order record within this transaction and returns its
    /// first version. Fails with `DuplicateOrder` if the id is taken.
    async fn insert_order(&mut self, order: &Order) -> Result<Version>;

    /// Replaces an order record within this transaction, with the same
    /// version check as [`OrderStore::update_order`].
    async fn update_order(&mut self, order: &Order) -> Result<Version>;

    /// Makes every adjustment and order write permanent and releases the
    /// locks. On error nothing of the transaction is applied.
    async fn commit(self) -> Result<()>;

    /// Undoes every adjustment, discards order writes and releases the locks.
    async fn rollback(self) -> Result<()>;
}

/// Store of products and their stock.
///
/// Every stock change is linearizable per product: two concurrent
/// decrements that together would overdraw a product never both succeed.
#[async_trait]
pub trait ProductStore: Send + Sync {
    type Transaction: StockTransaction;

    /// Inserts a new product. Fails with `DuplicateProduct` if the id is taken.
    async fn insert_product(&self, product: Product) -> Result<()>;

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Lists all products ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Conditionally adjusts one product's stock outside any transaction.
    async fn try_adjust(&self, product_id: &ProductId, delta: i64) -> Result<StockLevel>;

    /// Opens a stock transaction over the given products.
    ///
    /// Locks are taken in ascending product-id order (duplicates merged), so
    /// transactions over overlapping product sets cannot deadlock. Ids that
    /// do not exist are skipped here and reported by
    /// [`StockTransaction::adjust`].
    async fn begin(&self, product_ids: &[ProductId]) -> Result<Self::Transaction>;
}

/// Store of order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order and returns its first version.
    ///
    /// Orders that reserve stock are written through
    /// [`StockTransaction::insert_order`] instead.
    async fn insert_order(&self, order: &Order) -> Result<Version>;

    /// Replaces an order, checking that the stored version still equals
    /// `order.version()`. Returns the new version.
    async fn update_order(&self, order: &Order) -> Result<Version>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// All orders, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Orders containing at least one item of the vendor, oldest first.
    async fn orders_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Order>>;

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// True if a `Pending` order contains the product.
    async fn has_pending_orders(&self, product_id: &ProductId) -> Result<bool>;
}

/// Store of vendor notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn save_notification(&self, notification: Notification) -> Result<()>;

    /// Notifications for one vendor, oldest first.
    async fn notifications_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Notification>>;

    async fn all_notifications(&self) -> Result<Vec<Notification>>;

    /// Marks a notification read. Fails with `NotificationNotFound` if absent.
    async fn mark_notification_read(&self, notification_id: NotificationId) -> Result<()>;
}

/// Everything the services need from a single backend.
pub trait MarketplaceStore:
    ProductStore + OrderStore + NotificationStore + Clone + 'static
{
}

impl<T> MarketplaceStore for T where
    T: ProductStore + OrderStore + NotificationStore + Clone + 'static
{
}
