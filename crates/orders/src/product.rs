//! Product registration command.

use common::{ProductId, VendorId};
use domain::Money;

use crate::error::{OrderServiceError, Result};

/// Command to add a product to the catalog with its initial stock.
#[derive(Debug, Clone)]
pub struct RegisterProduct {
    /// Generated when absent.
    pub product_id: Option<ProductId>,
    pub vendor_id: VendorId,
    pub name: String,
    pub unit_price: Money,
    pub stock: i64,
}

impl RegisterProduct {
    pub fn new(
        vendor_id: impl Into<VendorId>,
        name: impl Into<String>,
        unit_price: Money,
        stock: i64,
    ) -> Self {
        Self {
            product_id: None,
            vendor_id: vendor_id.into(),
            name: name.into(),
            unit_price,
            stock,
        }
    }

    /// Uses a caller-chosen id instead of a generated one.
    pub fn with_id(mut self, product_id: impl Into<ProductId>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrderServiceError::Validation(
                "Product name is required".to_string(),
            ));
        }
        if self.vendor_id.as_str().trim().is_empty() {
            return Err(OrderServiceError::Validation(
                "Vendor id is required".to_string(),
            ));
        }
        if self
            .product_id
            .as_ref()
            .is_some_and(|id| id.as_str().trim().is_empty())
        {
            return Err(OrderServiceError::Validation(
                "Product id must not be blank".to_string(),
            ));
        }
        if self.unit_price.is_negative() {
            return Err(OrderServiceError::Validation(format!(
                "Invalid price: {}",
                self.unit_price
            )));
        }
        if self.stock < 0 {
            return Err(OrderServiceError::Validation(format!(
                "Invalid stock: {}",
                self.stock
            )));
        }
        Ok(())
    }
}
