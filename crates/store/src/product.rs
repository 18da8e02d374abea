use domain::Money;
use serde::{Deserialize, Serialize};

use crate::{ProductId, VendorId};

/// A vendor-owned product and its available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub unit_price: Money,

    /// Units available for new orders. Never negative.
    pub stock: i64,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        vendor_id: impl Into<VendorId>,
        name: impl Into<String>,
        unit_price: Money,
        stock: i64,
    ) -> Self {
        Self {
            id: id.into(),
            vendor_id: vendor_id.into(),
            name: name.into(),
            unit_price,
            stock,
        }
    }

    /// Current stock as a ledger reading.
    pub fn stock_level(&self) -> StockLevel {
        StockLevel {
            product_id: self.id.clone(),
            vendor_id: self.vendor_id.clone(),
            quantity: self.stock,
        }
    }
}

/// Stock of one product after an adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub vendor_id: VendorId,
    pub quantity: i64,
}
