//! Fulfillment state machine.
//!
//! Order status is never taken at face value from a status-update request.
//! A request is first turned into candidate [`FulfillmentEvent`]s (using the
//! readiness flags of the line items) and each candidate is looked up in the
//! transition table against the current status. Everything in this module
//! is a pure function of its inputs.

use std::collections::BTreeMap;

use common::VendorId;

use crate::order::{OrderError, OrderLineItem, OrderStatus};

/// Something that can move an order along the fulfillment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FulfillmentEvent {
    /// A vendor or operator picked the order up.
    Acknowledged,
    /// Every item of the requesting vendor is ready.
    VendorReady,
    /// Every item of every vendor is ready.
    AllReady,
    /// Operator override: the order left the warehouse.
    Dispatched,
    /// Operator override: the customer received the order.
    Delivered,
    /// The order was cancelled.
    Cancelled,
}

/// The transition table. Returns `None` when the event does not apply in
/// the given status; callers treat that as "status unchanged".
///
/// `Dispatched` and `Delivered` skip the readiness checks entirely and are
/// accepted from every non-terminal status.
pub fn transition(current: OrderStatus, event: FulfillmentEvent) -> Option<OrderStatus> {
    use FulfillmentEvent as E;
    use OrderStatus as S;

    match (current, event) {
        (S::Delivered | S::Cancelled, _) => None,

        (S::Pending, E::Acknowledged) => Some(S::Processing),

        (S::Processing, E::VendorReady) => Some(S::PartiallyReady),

        (S::Pending | S::Processing | S::PartiallyReady | S::ReadyForShipment, E::AllReady) => {
            Some(S::ReadyForShipment)
        }

        (_, E::Dispatched) => Some(S::OrderDispatched),
        (_, E::Delivered) => Some(S::Delivered),
        (_, E::Cancelled) => Some(S::Cancelled),

        _ => None,
    }
}

/// Readiness of an order's line items, partitioned by vendor.
#[derive(Debug, Clone, Default)]
pub struct Readiness<'a> {
    by_vendor: BTreeMap<&'a VendorId, (usize, usize)>,
}

impl<'a> Readiness<'a> {
    /// Partitions the given line items by vendor.
    pub fn of(items: &'a [OrderLineItem]) -> Self {
        let mut by_vendor: BTreeMap<&VendorId, (usize, usize)> = BTreeMap::new();
        for item in items {
            let entry = by_vendor.entry(&item.vendor_id).or_default();
            entry.1 += 1;
            if item.is_ready {
                entry.0 += 1;
            }
        }
        Self { by_vendor }
    }

    /// True if the vendor has at least one item and all of them are ready.
    pub fn vendor_ready(&self, vendor_id: &VendorId) -> bool {
        self.by_vendor
            .get(vendor_id)
            .is_some_and(|(ready, total)| *total > 0 && ready == total)
    }

    /// True if the order has items and every one of them is ready.
    pub fn all_ready(&self) -> bool {
        !self.by_vendor.is_empty() && self.by_vendor.values().all(|(ready, total)| ready == total)
    }
}

/// Computes the status an order moves to for a status-update request.
///
/// - `OrderDispatched` / `Delivered` are applied directly.
/// - `Cancelled` is rejected; cancellation has its own operation.
/// - Anything else is recomputed from readiness. The furthest applicable
///   event wins: all items ready, then the requesting vendor's items ready,
///   then (for a `Processing` request) acknowledgement of a pending order.
///   If nothing applies the status is unchanged.
pub fn derive_status(
    current: OrderStatus,
    items: &[OrderLineItem],
    requested: OrderStatus,
    vendor_id: Option<&VendorId>,
) -> Result<OrderStatus, OrderError> {
    let candidates: Vec<FulfillmentEvent> = match requested {
        OrderStatus::Cancelled => return Err(OrderError::CancellationViaStatusUpdate),
        OrderStatus::OrderDispatched => vec![FulfillmentEvent::Dispatched],
        OrderStatus::Delivered => vec![FulfillmentEvent::Delivered],
        OrderStatus::Pending
        | OrderStatus::Processing
        | OrderStatus::PartiallyReady
        | OrderStatus::ReadyForShipment => {
            let readiness = Readiness::of(items);
            let mut events = Vec::with_capacity(3);
            if readiness.all_ready() {
                events.push(FulfillmentEvent::AllReady);
            }
            if vendor_id.is_some_and(|v| readiness.vendor_ready(v)) {
                events.push(FulfillmentEvent::VendorReady);
            }
            if requested == OrderStatus::Processing {
                events.push(FulfillmentEvent::Acknowledged);
            }
            events
        }
    };

    Ok(candidates
        .into_iter()
        .find_map(|event| transition(current, event))
        .unwrap_or(current))
}
