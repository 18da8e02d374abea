use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotificationId, VendorId};

/// A message addressed to a vendor, e.g. a low-stock alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub vendor_id: VendorId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification.
    pub fn new(vendor_id: VendorId, message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            vendor_id,
            message: message.into(),
            is_read: false,
            created_at,
        }
    }
}
