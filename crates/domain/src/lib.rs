//! Domain layer for the marketplace fulfillment engine.
//!
//! This crate provides the pure parts of order handling:
//! - The order record with its vendor-owned line items
//! - The order status enum and fulfillment transition table
//! - Command types accepted by the order service
//!
//! Nothing here touches storage; persistence and stock live in other crates.

pub mod fulfillment;
pub mod order;

pub use fulfillment::{FulfillmentEvent, Readiness, derive_status, transition};
pub use order::{
    CancelOrder, CreateOrder, Money, Order, OrderError, OrderLineItem, OrderStatus,
    SetItemReadiness, UpdateOrderStatus,
};
