//! Order status values.

use serde::{Deserialize, Serialize};

/// The fulfillment status of an order.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► PartiallyReady ──► ReadyForShipment ──► OrderDispatched ──► Delivered
///    │            │                │                   │                    │
///    └────────────┴────────────────┴───────────────────┴────────────────────┴──► Cancelled
/// ```
///
/// The full table, including the readiness-driven shortcuts and the
/// dispatch/delivery override, lives in [`crate::fulfillment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Stock reserved, nobody has picked the order up yet.
    #[default]
    Pending,

    /// Acknowledged by the vendors, items are being prepared.
    Processing,

    /// At least one vendor has all of its items ready.
    PartiallyReady,

    /// Every item across every vendor is ready.
    ReadyForShipment,

    /// Handed to the carrier.
    OrderDispatched,

    /// Received by the customer (terminal state).
    Delivered,

    /// Cancelled and stock released (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses in fulfillment order, `Cancelled` last.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::PartiallyReady,
        OrderStatus::ReadyForShipment,
        OrderStatus::OrderDispatched,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position along the fulfillment path. `Cancelled` has no position.
    pub fn progress(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::PartiallyReady => Some(2),
            OrderStatus::ReadyForShipment => Some(3),
            OrderStatus::OrderDispatched => Some(4),
            OrderStatus::Delivered => Some(5),
            OrderStatus::Cancelled => None,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::PartiallyReady => "PartiallyReady",
            OrderStatus::ReadyForShipment => "ReadyForShipment",
            OrderStatus::OrderDispatched => "OrderDispatched",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}
