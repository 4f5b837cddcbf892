use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use bogbon_core::{
    parse_category_ids, ProductDraft, ProductFilter, ProductTranslationInput, ProductTranslations,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::categories::{translation_map, CategoryTranslationItem};
use super::extract::{ApiJson, ApiPath};
use super::{map_db_error, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ProductTranslationItem {
    pub name: String,
    pub description: String,
    pub short_info: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductCategoryItem {
    pub id: i64,
    pub translations: BTreeMap<String, CategoryTranslationItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductImageItem {
    pub id: i64,
    pub url: String,
    pub is_original: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    pub id: i64,
    pub price: i64,
    pub stock: i32,
    #[serde(rename = "type")]
    pub product_type: String,
    pub name: String,
    pub description: String,
    pub translations: BTreeMap<String, ProductTranslationItem>,
    pub categories: Vec<ProductCategoryItem>,
    pub images: Vec<ProductImageItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<bogbon_db::ProductImageRow> for ProductImageItem {
    fn from(row: bogbon_db::ProductImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            is_original: row.is_original,
        }
    }
}

impl From<bogbon_db::ProductDetail> for ProductItem {
    fn from(detail: bogbon_db::ProductDetail) -> Self {
        let product = detail.product;
        Self {
            id: product.id,
            price: product.price,
            stock: product.stock,
            product_type: product.product_type,
            name: product.name,
            description: product.description,
            translations: detail
                .translations
                .into_iter()
                .map(|t| {
                    (
                        t.language_code,
                        ProductTranslationItem {
                            name: t.name,
                            description: t.description,
                            short_info: t.short_info,
                        },
                    )
                })
                .collect(),
            categories: detail
                .categories
                .into_iter()
                .map(|c| ProductCategoryItem {
                    id: c.id,
                    translations: translation_map(c.translations),
                })
                .collect(),
            images: detail.images.into_iter().map(Into::into).collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Raw filter parameters; parsed by hand so malformed values produce the
/// standard error envelope.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ProductQuery {
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub in_stock: Option<String>,
    pub category_ids: Option<String>,
    pub q: Option<String>,
    pub original: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductRequest {
    pub price: i64,
    pub stock: i32,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub category_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub translations: BTreeMap<String, ProductTranslationInput>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AddImageRequest {
    pub url: String,
    #[serde(default)]
    pub is_original: bool,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn parse_param<T: FromStr>(
    req_id: &str,
    name: &str,
    raw: Option<&str>,
) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|_| {
            ApiError::validation(req_id, format!("invalid value for '{name}': '{v}'"))
        }),
    }
}

fn build_filter(req_id: &str, query: ProductQuery) -> Result<ProductFilter, ApiError> {
    let filter = ProductFilter {
        min_price: parse_param(req_id, "min_price", query.min_price.as_deref())?,
        max_price: parse_param(req_id, "max_price", query.max_price.as_deref())?,
        product_type: query.product_type,
        in_stock: parse_param(req_id, "in_stock", query.in_stock.as_deref())?.unwrap_or(false),
        category_ids: query
            .category_ids
            .as_deref()
            .map(parse_category_ids)
            .transpose()
            .map_err(|e| ApiError::validation(req_id, e.to_string()))?
            .unwrap_or_default(),
        q: query.q,
        original: parse_param(req_id, "original", query.original.as_deref())?,
    };
    filter
        .validate()
        .map_err(|e| ApiError::validation(req_id, e.to_string()))?;
    Ok(filter)
}

fn build_draft(req_id: &str, body: ProductRequest) -> Result<ProductDraft, ApiError> {
    let translations = ProductTranslations::new(body.translations)
        .map_err(|e| ApiError::validation(req_id, e.to_string()))?;
    ProductDraft::new(
        body.price,
        body.stock,
        &body.product_type,
        body.category_ids,
        translations,
    )
    .map_err(|e| ApiError::validation(req_id, e.to_string()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/products — filtered catalog listing.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let filter = build_filter(&req_id.0, query)?;

    let rows = bogbon_db::filter_products(&state.pool, &filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ProductItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let draft = build_draft(&req_id.0, body)?;

    let detail = bogbon_db::create_product(&state.pool, &draft)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(product_id = detail.product.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, detail.into())),
    ))
}

/// GET /api/v1/products/{id}
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let detail = bogbon_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, format!("product {id} not found")))?;

    Ok(Json(ApiResponse::new(req_id.0, detail.into())))
}

/// PUT /api/v1/products/{id} — full replace of fields and translations;
/// category links are replaced only when `category_ids` is present.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let draft = build_draft(&req_id.0, body)?;

    let detail = bogbon_db::update_product(&state.pool, id, &draft)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, detail.into())))
}

/// DELETE /api/v1/products/{id} — soft delete.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = bogbon_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;

    if deleted {
        tracing::info!(product_id = id, "product soft-deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/products/{id}/images
pub(super) async fn add_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AddImageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductImageItem>>), ApiError> {
    let url = bogbon_core::image_url(&body.url)
        .map_err(|e| ApiError::validation(req_id.0.clone(), e.to_string()))?;

    let image = bogbon_db::add_product_image(&state.pool, id, url, body.is_original)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, image.into())),
    ))
}

/// DELETE /api/v1/products/images/{image_id}
pub(super) async fn delete_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiPath(image_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    bogbon_db::delete_product_image(&state.pool, image_id)
        .await
        .map_err(|e| map_db_error(req_id.0, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_filter_parses_every_parameter() {
        let query = ProductQuery {
            min_price: Some("100".to_string()),
            max_price: Some(" 500 ".to_string()),
            product_type: Some("plant".to_string()),
            in_stock: Some("true".to_string()),
            category_ids: Some("3,1".to_string()),
            q: Some("fern".to_string()),
            original: Some("false".to_string()),
        };
        let filter = build_filter("req", query).expect("valid filter");
        assert_eq!(filter.min_price, Some(100));
        assert_eq!(filter.max_price, Some(500));
        assert!(filter.in_stock);
        assert_eq!(filter.category_ids, vec![3, 1]);
        assert_eq!(filter.original, Some(false));
    }

    #[test]
    fn empty_query_yields_default_filter() {
        let filter = build_filter("req", ProductQuery::default()).expect("valid filter");
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn bad_boolean_is_rejected() {
        let query = ProductQuery {
            in_stock: Some("yes".to_string()),
            ..Default::default()
        };
        let err = build_filter("req", query).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
        assert!(err.error.message.contains("in_stock"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let query = ProductQuery {
            min_price: Some("-10".to_string()),
            ..Default::default()
        };
        assert!(build_filter("req", query).is_err());
    }

    #[test]
    fn draft_requires_english_translation() {
        let body = ProductRequest {
            price: 100,
            stock: 1,
            product_type: "plant".to_string(),
            category_ids: None,
            translations: BTreeMap::new(),
        };
        let err = build_draft("req", body).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }
}
