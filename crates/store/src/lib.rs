//! Persistence for the marketplace fulfillment engine.
//!
//! Three stores live here, each behind a trait so the services can run
//! against memory in tests and Postgres in production:
//! - [`ProductStore`]: stock records, single conditional adjustments and
//!   multi-product [`StockTransaction`]s
//! - [`OrderStore`]: order records with optimistic version checks
//! - [`NotificationStore`]: vendor notifications

pub mod error;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod product;
pub mod store;

pub use common::{CustomerId, NotificationId, OrderId, ProductId, VendorId, Version};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStockTransaction, InMemoryStore};
pub use notification::Notification;
pub use postgres::{PostgresStockTransaction, PostgresStore};
pub use product::{Product, StockLevel};
pub use store::{MarketplaceStore, NotificationStore, OrderStore, ProductStore, StockTransaction};
