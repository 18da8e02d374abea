//! Vendor notification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{NotificationId, VendorId};
use serde::Serialize;
use store::{MarketplaceStore, Notification};

use super::{AppState, parse_uuid};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub vendor_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            vendor_id: n.vendor_id.to_string(),
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// GET /notifications
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.order_service.all_notifications().await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// GET /notifications/{vendor_id}
#[tracing::instrument(skip(state))]
pub async fn for_vendor<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(vendor_id): Path<String>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state
        .order_service
        .notifications_for_vendor(&VendorId::new(vendor_id))
        .await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// PUT /notifications/{id}/read
#[tracing::instrument(skip(state))]
pub async fn mark_read<S: MarketplaceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let notification_id = NotificationId::from_uuid(parse_uuid("notification ID", &id)?);
    state
        .order_service
        .mark_notification_read(notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
