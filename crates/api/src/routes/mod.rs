//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod products;

use ::orders::OrderService;
use store::MarketplaceStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketplaceStore> {
    pub order_service: OrderService<S>,
}

impl<S: MarketplaceStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            order_service: OrderService::new(store),
        }
    }
}

fn parse_uuid(kind: &str, id: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} format: {e}")))
}
