use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::{RequestId, SessionId};

use super::cart::ProductSummary;
use super::extract::{ApiJson, ApiPath};
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct OrderLineItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product: ProductSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderView {
    pub id: i64,
    pub session_id: String,
    pub cart_id: i64,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineItem>,
}

/// Only the paid flag can change after checkout.
#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderRequest {
    pub is_paid: bool,
}

impl From<bogbon_db::Order> for OrderView {
    fn from(order: bogbon_db::Order) -> Self {
        Self {
            id: order.order.id,
            session_id: order.order.session_id,
            cart_id: order.order.cart_id,
            is_paid: order.order.is_paid,
            created_at: order.order.created_at,
            items: order
                .items
                .into_iter()
                .map(|line| OrderLineItem {
                    id: line.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product: ProductSummary {
                        id: line.product_id,
                        price: line.product_price,
                        product_type: line.product_type,
                        name: line.product_name,
                        available: line.product_deleted_at.is_none(),
                    },
                })
                .collect(),
        }
    }
}

/// POST /api/v1/order — check out the caller's cart.
pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ApiError> {
    let order = bogbon_db::create_order_from_cart(&state.pool, &session.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, order.into())),
    ))
}

/// GET /api/v1/order — the caller's most recent order.
pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<ApiResponse<OrderView>>, ApiError> {
    let order = bogbon_db::get_latest_order_for_session(&state.pool, &session.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "no order for this session"))?;

    Ok(Json(ApiResponse::new(req_id.0, order.into())))
}

/// DELETE /api/v1/order — drop every order of the caller's session.
pub(super) async fn delete_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
) -> Result<StatusCode, ApiError> {
    let removed = bogbon_db::delete_orders_for_session(&state.pool, &session.0)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    tracing::info!(session_id = %session.0, removed, "session orders deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/orders — every order, newest first.
pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ApiError> {
    let orders = bogbon_db::list_orders(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = orders.into_iter().map(OrderView::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// PATCH /api/v1/orders/{id}
pub(super) async fn update_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderView>>, ApiError> {
    let order = bogbon_db::update_order_paid(&state.pool, id, body.is_paid)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(order_id = id, is_paid = body.is_paid, "order updated");
    Ok(Json(ApiResponse::new(req_id.0, order.into())))
}
