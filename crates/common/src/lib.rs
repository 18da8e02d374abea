//! Shared identifier types used across the marketplace crates.

mod ids;
mod version;

pub use ids::{CustomerId, NotificationId, OrderId, ProductId, VendorId};
pub use version::Version;
