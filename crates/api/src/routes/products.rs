//! Product registry and stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::Money;
use orders::RegisterProduct;
use serde::{Deserialize, Serialize};
use store::{MarketplaceStore, Product, StockLevel};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterProductRequest {
    pub product_id: Option<String>,
    pub vendor_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: i64,
}

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            vendor_id: product.vendor_id.to_string(),
            name: product.name,
            unit_price_cents: product.unit_price.cents(),
            stock: product.stock,
        }
    }
}

#[derive(Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub vendor_id: String,
    pub stock: i64,
}

impl From<StockLevel> for StockResponse {
    fn from(level: StockLevel) -> Self {
        Self {
            product_id: level.product_id.to_string(),
            vendor_id: level.vendor_id.to_string(),
            stock: level.quantity,
        }
    }
}

#[derive(Serialize)]
pub struct PendingOrdersResponse {
    pub product_id: String,
    pub has_pending_orders: bool,
}

/// POST /products — register a product with its initial stock.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let mut cmd = RegisterProduct::new(
        req.vendor_id,
        req.name,
        Money::from_cents(req.unit_price_cents),
        req.stock,
    );
    if let Some(id) = req.product_id {
        cmd = cmd.with_id(id);
    }

    let product = state.order_service.register_product(cmd).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.order_service.list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.order_service.get_product(&ProductId::new(id)).await?;
    Ok(Json(product.into()))
}

/// POST /products/{id}/restock
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<StockResponse>, ApiError> {
    let level = state
        .order_service
        .restock(&ProductId::new(id), req.quantity)
        .await?;
    Ok(Json(level.into()))
}

/// GET /products/{id}/pending-orders — whether a pending order holds the product.
#[tracing::instrument(skip(state))]
pub async fn pending_orders<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PendingOrdersResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let has_pending_orders = state.order_service.has_pending_orders(&product_id).await?;
    Ok(Json(PendingOrdersResponse {
        product_id: product_id.to_string(),
        has_pending_orders,
    }))
}
