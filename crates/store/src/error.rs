use thiserror::Error;

use crate::{NotificationId, OrderId, ProductId, Version};

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order was written by someone else since it was loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A stock decrement would drive the quantity below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A stock increment would exceed the largest representable quantity.
    #[error("Stock of product {product_id} cannot grow by {delta}")]
    StockOverflow { product_id: ProductId, delta: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A stock transaction touched a product it did not lock in `begin`.
    #[error("Product {0} was not locked by this stock transaction")]
    ProductNotLocked(ProductId),

    #[error("Product already exists: {0}")]
    DuplicateProduct(ProductId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
