//! Per-order mutual exclusion within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::OrderId;
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Keyed async locks, one per order id.
///
/// Entries are created on demand and removed when the last holder or
/// waiter goes away, so the table only grows with concurrently touched
/// orders.
#[derive(Debug, Clone, Default)]
pub struct OrderLocks {
    slots: Arc<Mutex<HashMap<OrderId, Slot>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the order.
    pub async fn lock(&self, order_id: OrderId) -> OrderGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(order_id).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        OrderGuard {
            order_id,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Number of orders currently locked or waited on.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one order; released on drop.
pub struct OrderGuard {
    order_id: OrderId,
    slots: Arc<Mutex<HashMap<OrderId, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the table and our guard. Nobody is waiting.
        if let Some(slot) = slots.get(&self.order_id)
            && Arc::strong_count(slot) <= 2
        {
            slots.remove(&self.order_id);
        }
        self.guard.take();
    }
}
