//! Order commands.

use common::{CustomerId, OrderId, ProductId, VendorId};
use serde::{Deserialize, Serialize};

use super::{OrderLineItem, OrderStatus};

/// Command to place a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    /// The order ID to create.
    pub order_id: OrderId,

    /// The customer placing the order.
    pub customer_id: CustomerId,

    pub shipping_address: String,

    /// Line items; the order of this list is preserved on the order.
    pub items: Vec<OrderLineItem>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(
        customer_id: CustomerId,
        shipping_address: impl Into<String>,
        items: Vec<OrderLineItem>,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            customer_id,
            shipping_address: shipping_address.into(),
            items,
        }
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: OrderId,

    /// Free-form note stored on the order.
    pub cancellation_note: Option<String>,
}

impl CancelOrder {
    pub fn new(order_id: OrderId, cancellation_note: Option<String>) -> Self {
        Self {
            order_id,
            cancellation_note,
        }
    }
}

/// Request to move an order along the fulfillment path.
///
/// `status` is what the caller asks for; the state machine decides what
/// the order actually becomes.
#[derive(Debug, Clone)]
pub struct UpdateOrderStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,

    /// Vendor on whose behalf the request is made.
    pub vendor_id: Option<VendorId>,
}

impl UpdateOrderStatus {
    pub fn new(order_id: OrderId, status: OrderStatus, vendor_id: Option<VendorId>) -> Self {
        Self {
            order_id,
            status,
            vendor_id,
        }
    }
}

/// Command for a vendor to flag one of its items as (not) ready.
#[derive(Debug, Clone)]
pub struct SetItemReadiness {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub is_ready: bool,
}

impl SetItemReadiness {
    pub fn new(
        order_id: OrderId,
        product_id: impl Into<ProductId>,
        vendor_id: impl Into<VendorId>,
        is_ready: bool,
    ) -> Self {
        Self {
            order_id,
            product_id: product_id.into(),
            vendor_id: vendor_id.into(),
            is_ready,
        }
    }
}
