//! Ledger and reservation error types.

use common::{ProductId, VendorId};
use store::StoreError;
use thiserror::Error;

/// Errors from single-product ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The adjustment would push stock past the largest representable quantity.
    #[error("Stock of product {product_id} cannot grow by {delta}")]
    StockOverflow { product_id: ProductId, delta: i64 },

    /// Restock quantities must be positive.
    #[error("Invalid restock quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => Self::ProductNotFound(id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::StockOverflow { product_id, delta } => {
                Self::StockOverflow { product_id, delta }
            }
            other => Self::Store(other),
        }
    }
}

/// Why a reservation or release could not be applied.
///
/// Every variant except `Store` names the first line item that failed.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The line item names a vendor that does not own the product.
    #[error("Product {product_id} belongs to vendor {actual}, not {expected}")]
    VendorMismatch {
        product_id: ProductId,
        expected: VendorId,
        actual: VendorId,
    },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ReservationError {
    /// The offending product, if the failure is tied to one.
    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            Self::ProductNotFound(id) => Some(id),
            Self::InsufficientStock { product_id, .. } | Self::VendorMismatch { product_id, .. } => {
                Some(product_id)
            }
            Self::Store(_) => None,
        }
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::VendorMismatch { .. } => "vendor_mismatch",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => Self::ProductNotFound(id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => Self::Store(other),
        }
    }
}
