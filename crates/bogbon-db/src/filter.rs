//! The product filter engine.

use bogbon_core::ProductFilter;
use sqlx::PgPool;

use crate::products::{load_details, ProductDetail, ProductRow, PRODUCT_COLUMNS};
use crate::DbError;

/// Returns live products matching every predicate in `filter`, ordered by id.
///
/// An empty filter returns every live product. An inverted price range
/// (`min_price > max_price`) returns an empty list without querying.
///
/// # Errors
///
/// Returns [`DbError::Invalid`] for negative price bounds, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn filter_products(
    pool: &PgPool,
    filter: &ProductFilter,
) -> Result<Vec<ProductDetail>, DbError> {
    filter.validate()?;
    if filter.has_empty_price_range() {
        return Ok(Vec::new());
    }

    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} \
         FROM products p \
         WHERE p.deleted_at IS NULL \
           AND ($1::BIGINT IS NULL OR p.price >= $1) \
           AND ($2::BIGINT IS NULL OR p.price <= $2) \
           AND ($3::TEXT IS NULL OR p.product_type = $3) \
           AND (NOT $4 OR p.stock > 0) \
           AND (cardinality($5::BIGINT[]) = 0 OR EXISTS ( \
               SELECT 1 FROM category_products cp \
               WHERE cp.product_id = p.id AND cp.category_id = ANY($5))) \
           AND ($6::TEXT IS NULL \
               OR p.name ILIKE $6 \
               OR EXISTS ( \
                   SELECT 1 FROM product_translations pt \
                   WHERE pt.product_id = p.id \
                     AND (pt.name ILIKE $6 OR pt.description ILIKE $6))) \
         ORDER BY p.id"
    ))
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(filter.type_predicate())
    .bind(filter.in_stock)
    .bind(&filter.category_ids)
    .bind(filter.search_pattern())
    .fetch_all(&mut *conn)
    .await?;

    tracing::debug!(matched = rows.len(), "product filter evaluated");
    load_details(&mut conn, rows, filter.original).await
}
