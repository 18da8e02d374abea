//! Order service error types.

use common::{NotificationId, OrderId, ProductId};
use domain::OrderError;
use inventory::{LedgerError, ReservationError};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`OrderService`](crate::OrderService) operations.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(OrderId),

    /// Malformed input or a request the order's current state rejects.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store failure or a lost version race; nothing was applied.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),
}

impl OrderServiceError {
    /// Maps an order-level rule violation for the given order.
    pub(crate) fn from_order(order_id: OrderId, err: OrderError) -> Self {
        match err {
            OrderError::AlreadyCancelled => Self::AlreadyCancelled(order_id),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<OrderError> for OrderServiceError {
    fn from(err: OrderError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for OrderServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            StoreError::ProductNotFound(id) => Self::ProductNotFound(id),
            StoreError::NotificationNotFound(id) => Self::NotificationNotFound(id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::DuplicateProduct(id) => {
                Self::Validation(format!("Product already exists: {id}"))
            }
            e @ StoreError::StockOverflow { .. } => Self::Validation(e.to_string()),
            other => Self::TransactionAborted(other.to_string()),
        }
    }
}

impl From<ReservationError> for OrderServiceError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::ProductNotFound(id) => Self::ProductNotFound(id),
            ReservationError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            e @ ReservationError::VendorMismatch { .. } => Self::Validation(e.to_string()),
            ReservationError::Store(e) => Self::TransactionAborted(e.to_string()),
        }
    }
}

impl From<LedgerError> for OrderServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProductNotFound(id) => Self::ProductNotFound(id),
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            e @ (LedgerError::InvalidQuantity(_) | LedgerError::StockOverflow { .. }) => {
                Self::Validation(e.to_string())
            }
            LedgerError::Store(e) => Self::TransactionAborted(e.to_string()),
        }
    }
}

/// Convenience type alias for order service results.
pub type Result<T> = std::result::Result<T, OrderServiceError>;
