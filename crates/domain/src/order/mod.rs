//! Order record and related types.

mod commands;
mod model;
mod status;
mod value_objects;

pub use commands::{CancelOrder, CreateOrder, SetItemReadiness, UpdateOrderStatus};
pub use model::Order;
pub use status::OrderStatus;
pub use value_objects::{Money, OrderLineItem};

use common::{ProductId, VendorId};
use thiserror::Error;

/// Errors raised by order validation and state changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Order has no line items.
    #[error("Order has no line items")]
    NoItems,

    /// Shipping address is required.
    #[error("Shipping address is required")]
    ShippingAddressRequired,

    /// A line item asks for zero units.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A line item carries a negative unit price.
    #[error("Invalid price for product {product_id}: {price} (must not be negative)")]
    InvalidPrice { product_id: ProductId, price: i64 },

    /// A line total or the order total does not fit in cents.
    #[error("Order amount overflows at product {product_id}")]
    AmountOverflow { product_id: ProductId },

    /// The order has already been cancelled.
    #[error("Order is already cancelled")]
    AlreadyCancelled,

    /// Order is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// Item not found in order.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// A vendor tried to change an item it does not own.
    #[error("Vendor {vendor_id} does not own item {product_id}")]
    NotItemOwner {
        product_id: ProductId,
        vendor_id: VendorId,
    },

    /// Cancellation must go through the cancel operation.
    #[error("Cancellation is not accepted as a status update")]
    CancellationViaStatusUpdate,
}
