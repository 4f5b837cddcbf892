use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use bogbon_core::{CategoryTranslationInput, CategoryTranslations};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::extract::{ApiJson, ApiPath};
use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CategoryTranslationItem {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryItem {
    pub id: i64,
    pub translations: BTreeMap<String, CategoryTranslationItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CategoryQuery {
    pub q: Option<String>,
}

/// Body for both create and update; update replaces every translation.
#[derive(Debug, Deserialize)]
pub(super) struct CategoryRequest {
    #[serde(default)]
    pub translations: BTreeMap<String, CategoryTranslationInput>,
}

pub(super) fn translation_map(
    rows: Vec<bogbon_db::CategoryTranslationRow>,
) -> BTreeMap<String, CategoryTranslationItem> {
    rows.into_iter()
        .map(|t| (t.language_code, CategoryTranslationItem { name: t.name }))
        .collect()
}

impl From<bogbon_db::Category> for CategoryItem {
    fn from(category: bogbon_db::Category) -> Self {
        Self {
            id: category.id,
            translations: translation_map(category.translations),
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

fn validated_translations(
    req_id: &str,
    body: CategoryRequest,
) -> Result<CategoryTranslations, ApiError> {
    CategoryTranslations::new(body.translations)
        .map_err(|e| ApiError::validation(req_id, e.to_string()))
}

/// GET /api/v1/categories
pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryItem>>>, ApiError> {
    let rows = bogbon_db::list_categories(&state.pool, query.q.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CategoryItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/categories
pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryItem>>), ApiError> {
    let translations = validated_translations(&req_id.0, body)?;

    let category = bogbon_db::create_category(&state.pool, &translations)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(category_id = category.id, "category created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, category.into())),
    ))
}

/// GET /api/v1/categories/{id}
pub(super) async fn get_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<CategoryItem>>, ApiError> {
    let category = bogbon_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, format!("category {id} not found")))?;

    Ok(Json(ApiResponse::new(req_id.0, category.into())))
}

/// PUT /api/v1/categories/{id}
pub(super) async fn update_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<Json<ApiResponse<CategoryItem>>, ApiError> {
    let translations = validated_translations(&req_id.0, body)?;

    let category = bogbon_db::update_category(&state.pool, id, &translations)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, category.into())))
}

/// DELETE /api/v1/categories/{id}
pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = bogbon_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    if deleted {
        tracing::info!(category_id = id, "category deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
