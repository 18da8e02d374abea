//! Single-product stock adjustments.

use common::ProductId;
use store::{ProductStore, StockLevel};

use crate::error::LedgerError;

/// Sole authority over a product's available quantity outside of order
/// reservations.
#[derive(Debug, Clone)]
pub struct StockLedger<P> {
    products: P,
}

impl<P: ProductStore> StockLedger<P> {
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Applies `delta` to the product's stock.
    ///
    /// A negative delta succeeds only if the result stays non-negative;
    /// concurrent adjustments of the same product are linearizable.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn try_adjust(
        &self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<StockLevel, LedgerError> {
        let level = self.products.try_adjust(product_id, delta).await?;
        tracing::debug!(quantity = level.quantity, "stock adjusted");
        Ok(level)
    }

    /// Adds `quantity` units to the product's stock.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn restock(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<StockLevel, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let level = self.products.try_adjust(product_id, quantity).await?;
        metrics::counter!("restocks_total").increment(1);
        tracing::info!(quantity = level.quantity, "product restocked");
        Ok(level)
    }

    /// Current available quantity.
    pub async fn available(&self, product_id: &ProductId) -> Result<i64, LedgerError> {
        self.products
            .get_product(product_id)
            .await
            .map_err(LedgerError::from)?
            .map(|p| p.stock)
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))
    }
}
