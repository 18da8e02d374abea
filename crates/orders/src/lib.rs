//! Order service for the marketplace fulfillment engine.
//!
//! [`OrderService`] ties the pieces together: it reserves stock through the
//! inventory coordinator, persists the order record, drives the
//! fulfillment state machine and alerts vendors about low stock.

pub mod error;
pub mod locks;
pub mod notifier;
pub mod product;
pub mod service;

pub use error::{OrderServiceError, Result};
pub use locks::{OrderGuard, OrderLocks};
pub use notifier::{NotificationSink, SinkError, StoreNotificationSink};
pub use product::RegisterProduct;
pub use service::OrderService;
