//! Order placement, cancellation, fulfillment and query endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, OrderId, ProductId, VendorId};
use domain::{
    CancelOrder, CreateOrder, Money, Order, OrderLineItem, OrderStatus, SetItemReadiness,
    UpdateOrderStatus,
};
use serde::{Deserialize, Serialize};
use store::MarketplaceStore;

use super::{AppState, parse_uuid};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub shipping_address: String,
    pub items: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub vendor_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub vendor_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub cancellation_note: Option<String>,
}

#[derive(Deserialize)]
pub struct ItemReadinessRequest {
    pub vendor_id: String,
    pub is_ready: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub created_at: String,
    pub shipping_address: String,
    pub status: String,
    pub cancellation_note: Option<String>,
    pub total_cents: i64,
    pub version: i64,
    pub items: Vec<LineItemResponse>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub vendor_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub is_ready: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub order_id: String,
    pub status: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            created_at: order.created_at().to_rfc3339(),
            shipping_address: order.shipping_address().to_string(),
            status: order.status().to_string(),
            cancellation_note: order.cancellation_note().map(String::from),
            total_cents: order.total_amount().cents(),
            version: order.version().as_i64(),
            items: order
                .items()
                .iter()
                .map(|item| LineItemResponse {
                    product_id: item.product_id.to_string(),
                    vendor_id: item.vendor_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    is_ready: item.is_ready,
                })
                .collect(),
        }
    }
}

fn to_responses(orders: &[Order]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

// -- Handlers --

/// POST /orders — place an order, reserving stock for every line item.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = match req.customer_id {
        Some(ref id) => CustomerId::from_uuid(parse_uuid("customer_id", id)?),
        None => CustomerId::new(),
    };

    let items = req
        .items
        .into_iter()
        .map(|item| {
            OrderLineItem::new(
                item.product_id,
                item.vendor_id,
                item.product_name,
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();

    let order = state
        .order_service
        .create_order(CreateOrder::new(customer_id, req.shipping_address, items))
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.get_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders().await?;
    Ok(Json(to_responses(&orders)))
}

/// GET /orders/vendor/{vendor_id} — orders containing any item of the vendor.
#[tracing::instrument(skip(state))]
pub async fn by_vendor<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(vendor_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .order_service
        .orders_for_vendor(&VendorId::new(vendor_id))
        .await?;
    Ok(Json(to_responses(&orders)))
}

/// GET /orders/customer/{customer_id}
#[tracing::instrument(skip(state))]
pub async fn by_customer<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let customer_id = CustomerId::from_uuid(parse_uuid("customer_id", &customer_id)?);
    let orders = state.order_service.orders_for_customer(customer_id).await?;
    Ok(Json(to_responses(&orders)))
}

/// PATCH /orders/{id}/status — request a fulfillment status change.
///
/// Responds with the status the order actually ended up in.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let requested = OrderStatus::from_str(&req.status).map_err(ApiError::BadRequest)?;

    let status = state
        .order_service
        .update_status(UpdateOrderStatus::new(
            order_id,
            requested,
            req.vendor_id.map(VendorId::new),
        ))
        .await?;

    Ok(Json(StatusResponse {
        order_id: order_id.to_string(),
        status: status.to_string(),
    }))
}

/// PATCH /orders/{id}/cancel — cancel an order and return its stock.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<CancelOrderRequest>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let note = req.and_then(|Json(req)| req.cancellation_note);

    let order = state
        .order_service
        .cancel_order(CancelOrder::new(order_id, note))
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/{id}/items/{product_id}/ready — vendor flags an item.
#[tracing::instrument(skip(state, req))]
pub async fn set_item_ready<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, product_id)): Path<(String, String)>,
    Json(req): Json<ItemReadinessRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let order = state
        .order_service
        .set_item_readiness(SetItemReadiness::new(
            order_id,
            ProductId::new(product_id),
            req.vendor_id,
            req.is_ready,
        ))
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    Ok(OrderId::from_uuid(parse_uuid("order ID", id)?))
}
