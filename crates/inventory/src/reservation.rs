//! All-or-nothing stock adjustments for one order operation, committed
//! together with the order record they belong to.

use std::time::Instant;

use common::{ProductId, Version};
use domain::{Order, OrderLineItem};
use store::{ProductStore, StockLevel, StockTransaction, StoreError};

use crate::error::ReservationError;

/// Stock below this quantity after a reservation triggers a low-stock alert.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// An applied but uncommitted set of stock adjustments.
///
/// Holds the unit of work, and with it the locks of every product the
/// order touches, until [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). Dropping it rolls the adjustments back.
pub struct Reservation<T: StockTransaction> {
    tx: T,
    levels: Vec<StockLevel>,
}

impl<T: StockTransaction> Reservation<T> {
    /// Final stock of each touched product, in first-touched order.
    pub fn levels(&self) -> &[StockLevel] {
        &self.levels
    }

    /// Touched products whose remaining stock is below
    /// [`LOW_STOCK_THRESHOLD`].
    pub fn low_stock(&self) -> impl Iterator<Item = &StockLevel> {
        self.levels
            .iter()
            .filter(|level| level.quantity < LOW_STOCK_THRESHOLD)
    }

    /// Writes a new order record in the same unit of work.
    pub async fn insert_order(&mut self, order: &Order) -> Result<Version, StoreError> {
        self.tx.insert_order(order).await
    }

    /// Replaces an order record in the same unit of work.
    pub async fn update_order(&mut self, order: &Order) -> Result<Version, StoreError> {
        self.tx.update_order(order).await
    }

    /// Makes the adjustments and the order write permanent and returns the
    /// final levels.
    pub async fn commit(self) -> Result<Vec<StockLevel>, ReservationError> {
        self.tx.commit().await?;
        Ok(self.levels)
    }

    pub async fn rollback(self) -> Result<(), ReservationError> {
        self.tx.rollback().await?;
        Ok(())
    }

    fn record(&mut self, level: StockLevel) {
        match self
            .levels
            .iter_mut()
            .find(|l| l.product_id == level.product_id)
        {
            Some(existing) => *existing = level,
            None => self.levels.push(level),
        }
    }
}

impl<T: StockTransaction> std::fmt::Debug for Reservation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("levels", &self.levels)
            .finish_non_exhaustive()
    }
}

/// Applies the stock side of order creation and cancellation.
///
/// Each call opens one unit of work over every product named by the line
/// items. Product locks are acquired in ascending id order before any
/// adjustment, so two orders over overlapping products cannot deadlock and
/// a partially applied reservation is never visible to anyone else.
#[derive(Debug, Clone)]
pub struct ReservationCoordinator<P> {
    products: P,
}

impl<P: ProductStore> ReservationCoordinator<P> {
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Decrements stock for every line item.
    ///
    /// On failure every adjustment made by this call is undone and the error
    /// names the first failing line item. On success the returned
    /// [`Reservation`] still holds the product locks.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn reserve(
        &self,
        items: &[OrderLineItem],
    ) -> Result<Reservation<P::Transaction>, ReservationError> {
        let start = Instant::now();

        let result = self.apply(items, true).await;

        metrics::histogram!("reservation_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        if let Err(ref e) = result {
            metrics::counter!("reservations_failed_total", "reason" => e.reason()).increment(1);
            tracing::info!(
                product_id = ?e.product_id(),
                error = %e,
                "reservation failed"
            );
        }

        result
    }

    /// Restores the quantity of every line item.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn release(
        &self,
        items: &[OrderLineItem],
    ) -> Result<Reservation<P::Transaction>, ReservationError> {
        self.apply(items, false).await
    }

    async fn apply(
        &self,
        items: &[OrderLineItem],
        reserve: bool,
    ) -> Result<Reservation<P::Transaction>, ReservationError> {
        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id.clone()).collect();
        let tx = self.products.begin(&product_ids).await?;

        let mut reservation = Reservation {
            tx,
            levels: Vec::with_capacity(items.len()),
        };

        for item in items {
            let delta = if reserve {
                item.reserve_delta()
            } else {
                -item.reserve_delta()
            };

            let outcome = match reservation.tx.adjust(&item.product_id, delta).await {
                Ok(level) if reserve && level.vendor_id != item.vendor_id => {
                    Err(ReservationError::VendorMismatch {
                        product_id: item.product_id.clone(),
                        expected: item.vendor_id.clone(),
                        actual: level.vendor_id,
                    })
                }
                Ok(level) => Ok(level),
                Err(e) => Err(ReservationError::from(e)),
            };

            match outcome {
                Ok(level) => reservation.record(level),
                Err(e) => {
                    if let Err(rollback_err) = reservation.rollback().await {
                        tracing::error!(error = %rollback_err, "failed to roll back stock transaction");
                    }
                    return Err(e);
                }
            }
        }

        Ok(reservation)
    }
}
