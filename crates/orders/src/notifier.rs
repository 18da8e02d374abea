//! Outbound vendor notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::VendorId;
use store::{Notification, NotificationStore};
use thiserror::Error;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct SinkError(pub String);

/// One-way channel to vendors.
///
/// Delivery is best effort: callers log failures and carry on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        vendor_id: &VendorId,
        message: String,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError>;
}

/// Sink that persists notifications in a [`NotificationStore`].
#[derive(Debug, Clone)]
pub struct StoreNotificationSink<N> {
    store: N,
}

impl<N: NotificationStore> StoreNotificationSink<N> {
    pub fn new(store: N) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<N: NotificationStore> NotificationSink for StoreNotificationSink<N> {
    async fn notify(
        &self,
        vendor_id: &VendorId,
        message: String,
        at: DateTime<Utc>,
    ) -> Result<(), SinkError> {
        self.store
            .save_notification(Notification::new(vendor_id.clone(), message, at))
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

/// Message sent to a vendor when a product runs low.
pub fn low_stock_message(product_id: &common::ProductId, remaining: i64) -> String {
    format!("Low stock: product {product_id} has {remaining} units left")
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    #[tokio::test]
    async fn test_store_sink_persists_unread_notification() {
        let store = InMemoryStore::new();
        let sink = StoreNotificationSink::new(store.clone());
        let vendor = VendorId::new("V1");

        sink.notify(&vendor, "hello".to_string(), Utc::now())
            .await
            .unwrap();

        let saved = store.notifications_for_vendor(&vendor).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].message, "hello");
        assert!(!saved[0].is_read);
    }

    #[test]
    fn test_low_stock_message_names_product_and_quantity() {
        let message = low_stock_message(&common::ProductId::new("SKU-9"), 3);
        assert!(message.contains("SKU-9"));
        assert!(message.contains('3'));
    }
}
