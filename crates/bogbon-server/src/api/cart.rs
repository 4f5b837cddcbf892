//! Session cart handlers. Every route runs behind the session middleware, so
//! a [`SessionId`] extension is always present.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use bogbon_core::{CoreError, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::{RequestId, SessionId};

use super::extract::{ApiJson, ApiPath};
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ProductSummary {
    pub id: i64,
    pub price: i64,
    #[serde(rename = "type")]
    pub product_type: String,
    pub name: String,
    /// `false` once the product has been deleted from the catalog.
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CartLineItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product: ProductSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct CartView {
    pub id: i64,
    pub session_id: String,
    pub items: Vec<CartLineItem>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct AddCartItemRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateCartItemRequest {
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

fn parse_quantity(req_id: &str, value: i64) -> Result<Quantity, ApiError> {
    Quantity::new(value).map_err(|e| ApiError::validation(req_id, e.to_string()))
}

impl From<bogbon_db::CartItemRow> for CartItem {
    fn from(row: bogbon_db::CartItemRow) -> Self {
        Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<bogbon_db::Cart> for CartView {
    type Error = CoreError;

    fn try_from(cart: bogbon_db::Cart) -> Result<Self, Self::Error> {
        let total = cart.total()?;
        Ok(Self {
            id: cart.cart.id,
            session_id: cart.cart.session_id,
            items: cart
                .items
                .into_iter()
                .map(|line| CartLineItem {
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
            total,
        })
    }
}

/// GET /api/v1/cart — the caller's cart, created empty on first read.
pub(super) async fn get_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let cart = bogbon_db::get_cart(&state.pool, &session.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let view = CartView::try_from(cart)
        .map_err(|e| ApiError::validation(req_id.0.clone(), e.to_string()))?;

    Ok(Json(ApiResponse::new(req_id.0, view)))
}

/// POST /api/v1/cart — add a product; repeated adds increment the line.
pub(super) async fn add_cart_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
    ApiJson(body): ApiJson<AddCartItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CartItem>>), ApiError> {
    let quantity = parse_quantity(&req_id.0, body.quantity)?;

    let item = bogbon_db::add_cart_item(&state.pool, &session.0, body.product_id, quantity)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, item.into())),
    ))
}

/// DELETE /api/v1/cart — remove every line.
pub(super) async fn clear_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
) -> Result<StatusCode, ApiError> {
    let removed = bogbon_db::clear_cart(&state.pool, &session.0)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    tracing::debug!(session_id = %session.0, removed, "cart cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/cart/items/{id}
pub(super) async fn update_cart_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
    ApiPath(item_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateCartItemRequest>,
) -> Result<Json<ApiResponse<CartItem>>, ApiError> {
    let quantity = parse_quantity(&req_id.0, body.quantity)?;

    let item = bogbon_db::update_cart_item(&state.pool, &session.0, item_id, quantity)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, item.into())))
}

/// DELETE /api/v1/cart/items/{id} — a missing item is not an error.
pub(super) async fn delete_cart_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(session): Extension<SessionId>,
    ApiPath(item_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    bogbon_db::delete_cart_item(&state.pool, &session.0, item_id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}
