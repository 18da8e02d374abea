//! Order record.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId, VendorId, Version};
use serde::{Deserialize, Serialize};

use crate::fulfillment::{self, FulfillmentEvent};

use super::{CreateOrder, Money, OrderError, OrderLineItem, OrderStatus};

/// An order spanning line items from one or more vendors.
///
/// Orders are created already `Pending`: the stock reservation happens
/// before the record exists. After that only the readiness flags, the
/// status and the cancellation note change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    /// Version of the persisted record, for optimistic concurrency.
    #[serde(default)]
    version: Version,

    created_at: DateTime<Utc>,
    customer_id: CustomerId,
    shipping_address: String,
    total_amount: Money,
    status: OrderStatus,
    cancellation_note: Option<String>,
    items: Vec<OrderLineItem>,
}

impl Order {
    /// Validates a create command without building the order.
    pub fn validate(cmd: &CreateOrder) -> Result<(), OrderError> {
        if cmd.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        if cmd.shipping_address.trim().is_empty() {
            return Err(OrderError::ShippingAddressRequired);
        }

        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.clone(),
                    price: item.unit_price.cents(),
                });
            }
        }

        Self::total_of(&cmd.items)?;

        Ok(())
    }

    fn total_of(items: &[OrderLineItem]) -> Result<Money, OrderError> {
        items.iter().try_fold(Money::zero(), |total, item| {
            item.total_price()
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| OrderError::AmountOverflow {
                    product_id: item.product_id.clone(),
                })
        })
    }

    /// Builds a `Pending` order from a validated create command.
    ///
    /// Readiness flags supplied by the caller are ignored; every item starts
    /// not ready.
    pub fn place(cmd: CreateOrder) -> Result<Self, OrderError> {
        Self::validate(&cmd)?;

        let items: Vec<OrderLineItem> = cmd
            .items
            .into_iter()
            .map(|mut item| {
                item.is_ready = false;
                item
            })
            .collect();
        let total_amount = Self::total_of(&items)?;

        Ok(Self {
            id: cmd.order_id,
            version: Version::initial(),
            created_at: Utc::now(),
            customer_id: cmd.customer_id,
            shipping_address: cmd.shipping_address,
            total_amount,
            status: OrderStatus::Pending,
            cancellation_note: None,
            items,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Records the version assigned by the store after a write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn cancellation_note(&self) -> Option<&str> {
        self.cancellation_note.as_deref()
    }

    /// Returns the line items in the order they were placed.
    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    /// Returns the first line item for a product.
    pub fn get_item(&self, product_id: &ProductId) -> Option<&OrderLineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Returns true if any line item belongs to the vendor.
    pub fn involves_vendor(&self, vendor_id: &VendorId) -> bool {
        self.items.iter().any(|item| &item.vendor_id == vendor_id)
    }

    /// Returns true if any line item references the product.
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.get_item(product_id).is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// State changes
impl Order {
    /// Marks the order cancelled and stores the note.
    ///
    /// Cancelling twice is an error, never a no-op: the caller releases
    /// stock exactly once per successful cancellation.
    pub fn cancel(&mut self, note: Option<String>) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyCancelled);
        }

        let next = fulfillment::transition(self.status, FulfillmentEvent::Cancelled).ok_or(
            OrderError::InvalidStateTransition {
                current_state: self.status,
                action: "cancel",
            },
        )?;

        self.status = next;
        self.cancellation_note = note;
        Ok(())
    }

    /// Sets the readiness flag on every line of `product_id` owned by `vendor_id`.
    pub fn set_item_ready(
        &mut self,
        product_id: &ProductId,
        vendor_id: &VendorId,
        ready: bool,
    ) -> Result<(), OrderError> {
        if self.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                current_state: self.status,
                action: "change item readiness",
            });
        }

        let mut lines = self
            .items
            .iter()
            .filter(|i| &i.product_id == product_id)
            .peekable();
        if lines.peek().is_none() {
            return Err(OrderError::ItemNotFound {
                product_id: product_id.clone(),
            });
        }
        if lines.any(|i| &i.vendor_id != vendor_id) {
            return Err(OrderError::NotItemOwner {
                product_id: product_id.clone(),
                vendor_id: vendor_id.clone(),
            });
        }

        self.items
            .iter_mut()
            .filter(|i| &i.product_id == product_id)
            .for_each(|i| i.is_ready = ready);
        Ok(())
    }

    /// Applies a status-update request through the fulfillment state machine
    /// and returns the resulting status.
    pub fn apply_status_request(
        &mut self,
        requested: OrderStatus,
        vendor_id: Option<&VendorId>,
    ) -> Result<OrderStatus, OrderError> {
        let next = fulfillment::derive_status(self.status, &self.items, requested, vendor_id)?;
        self.status = next;
        Ok(next)
    }
}
