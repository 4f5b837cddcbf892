//! Database operations for `products`, `product_translations`,
//! `product_images`, and the `category_products` join table.
//!
//! Products are soft-deleted through `deleted_at`. Catalog reads skip deleted
//! rows; cart and order lines still resolve them for display.

use std::collections::HashMap;

use bogbon_core::{image_url, order_images, CoreError, ImageOrdering, ProductDraft};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::categories::{load_translations as load_category_translations, CategoryTranslationRow};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
///
/// `name` and `description` are the legacy single-language columns, mirrored
/// from the `"en"` translation on every write.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub price: i64,
    pub stock: i32,
    pub product_type: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductTranslationRow {
    pub id: i64,
    pub product_id: i64,
    pub language_code: String,
    pub name: String,
    pub description: String,
    pub short_info: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    pub is_original: bool,
    pub created_at: DateTime<Utc>,
}

impl ImageOrdering for ProductImageRow {
    fn is_original(&self) -> bool {
        self.is_original
    }

    fn image_id(&self) -> i64 {
        self.id
    }
}

/// A category linked to a product, with its translations.
#[derive(Debug, Clone)]
pub struct ProductCategory {
    pub id: i64,
    pub translations: Vec<CategoryTranslationRow>,
}

/// A product with its translations, categories, and display-ordered images.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: ProductRow,
    pub translations: Vec<ProductTranslationRow>,
    pub categories: Vec<ProductCategory>,
    /// Originals first, then ascending id.
    pub images: Vec<ProductImageRow>,
}

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.price, p.stock, p.product_type, p.name, \
     p.description, p.created_at, p.updated_at, p.deleted_at";

// ---------------------------------------------------------------------------
// products operations
// ---------------------------------------------------------------------------

/// Creates a product with its translations and category links.
///
/// Runs in a single transaction; on any failure nothing is persisted.
///
/// # Errors
///
/// Returns [`DbError::Invalid`] if a category id does not exist, or
/// [`DbError::Sqlx`] on query failure.
pub async fn create_product(pool: &PgPool, draft: &ProductDraft) -> Result<ProductDetail, DbError> {
    let mut tx = pool.begin().await?;
    let id = insert_product(&mut *tx, draft).await?;
    tx.commit().await?;

    tracing::debug!(product_id = id, "product created");
    let mut conn = pool.acquire().await?;
    fetch_product_detail(&mut conn, id).await?.ok_or(DbError::NotFound)
}

/// Returns a live product with all relations, or `None` if it does not exist
/// or has been soft-deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductDetail>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_product_detail(&mut conn, id).await
}

/// Updates price, stock, type and the legacy columns, fully replaces the
/// translation set, and replaces category links when the draft carries them.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist or is deleted,
/// [`DbError::Invalid`] for unknown category ids, or [`DbError::Sqlx`] on
/// query failure. All changes roll back on error.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    draft: &ProductDraft,
) -> Result<ProductDetail, DbError> {
    let mut tx = pool.begin().await?;

    let touched = sqlx::query(
        "UPDATE products SET \
             price        = $2, \
             stock        = $3, \
             product_type = $4, \
             name         = $5, \
             description  = $6, \
             updated_at   = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(draft.price())
    .bind(draft.stock())
    .bind(draft.product_type())
    .bind(draft.legacy_name())
    .bind(draft.legacy_description())
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if touched == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query("DELETE FROM product_translations WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_translations(&mut *tx, id, draft).await?;

    if let Some(category_ids) = draft.category_ids() {
        sqlx::query("DELETE FROM category_products WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_categories(&mut *tx, id, category_ids).await?;
    }

    let detail = fetch_product_detail(&mut *tx, id)
        .await?
        .ok_or(DbError::NotFound)?;
    tx.commit().await?;
    Ok(detail)
}

/// Soft-deletes a product.
///
/// Returns `true` if the product was live and is now deleted; repeated calls
/// are no-ops.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE products SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// product_images operations
// ---------------------------------------------------------------------------

/// Records an image reference for a live product.
///
/// # Errors
///
/// Returns [`DbError::Invalid`] for a blank or over-long url,
/// [`DbError::NotFound`] if the product is missing or deleted, or
/// [`DbError::Sqlx`] on query failure.
pub async fn add_product_image(
    pool: &PgPool,
    product_id: i64,
    url: &str,
    is_original: bool,
) -> Result<ProductImageRow, DbError> {
    let url = image_url(url)?;

    let row = sqlx::query_as::<_, ProductImageRow>(
        "INSERT INTO product_images (product_id, url, is_original) \
         SELECT p.id, $2, $3 FROM products p \
         WHERE p.id = $1 AND p.deleted_at IS NULL \
         RETURNING id, product_id, url, is_original, created_at",
    )
    .bind(product_id)
    .bind(url)
    .bind(is_original)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Removes one image row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no image has this id.
pub async fn delete_product_image(pool: &PgPool, image_id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
        .bind(image_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) async fn insert_product(
    conn: &mut PgConnection,
    draft: &ProductDraft,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (price, stock, product_type, name, description) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(draft.price())
    .bind(draft.stock())
    .bind(draft.product_type())
    .bind(draft.legacy_name())
    .bind(draft.legacy_description())
    .fetch_one(&mut *conn)
    .await?;

    insert_translations(conn, id, draft).await?;
    if let Some(category_ids) = draft.category_ids() {
        link_categories(conn, id, category_ids).await?;
    }
    Ok(id)
}

pub(crate) async fn insert_image(
    conn: &mut PgConnection,
    product_id: i64,
    url: &str,
    is_original: bool,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO product_images (product_id, url, is_original) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(url)
        .bind(is_original)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_translations(
    conn: &mut PgConnection,
    product_id: i64,
    draft: &ProductDraft,
) -> Result<(), DbError> {
    for (language_code, t) in draft.translations().iter() {
        sqlx::query(
            "INSERT INTO product_translations \
                 (product_id, language_code, name, description, short_info) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product_id)
        .bind(language_code)
        .bind(&t.name)
        .bind(&t.description)
        .bind(&t.short_info)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Links a product to categories. Every id must exist.
async fn link_categories(
    conn: &mut PgConnection,
    product_id: i64,
    category_ids: &[i64],
) -> Result<(), DbError> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let known: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1) ORDER BY id")
            .bind(category_ids)
            .fetch_all(&mut *conn)
            .await?;
    if let Some(missing) = category_ids.iter().find(|id| !known.contains(id)) {
        return Err(CoreError::Validation(format!("unknown category id {missing}")).into());
    }

    sqlx::query(
        "INSERT INTO category_products (category_id, product_id) \
         SELECT UNNEST($1::BIGINT[]), $2 \
         ON CONFLICT DO NOTHING",
    )
    .bind(category_ids)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_product_detail(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<ProductDetail>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 AND p.deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(load_details(conn, vec![row], None).await?.pop()),
        None => Ok(None),
    }
}

#[derive(sqlx::FromRow)]
struct ProductCategoryLink {
    product_id: i64,
    category_id: i64,
}

/// Batch-loads translations, categories, and images for `rows`, preserving
/// their order.
///
/// `original` restricts the image list to originals (`Some(true)`) or resized
/// variants (`Some(false)`).
pub(crate) async fn load_details(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
    original: Option<bool>,
) -> Result<Vec<ProductDetail>, DbError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let translations = sqlx::query_as::<_, ProductTranslationRow>(
        "SELECT id, product_id, language_code, name, description, short_info \
         FROM product_translations \
         WHERE product_id = ANY($1) \
         ORDER BY product_id, language_code",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let links = sqlx::query_as::<_, ProductCategoryLink>(
        "SELECT product_id, category_id FROM category_products \
         WHERE product_id = ANY($1) \
         ORDER BY product_id, category_id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let images = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, url, is_original, created_at \
         FROM product_images \
         WHERE product_id = ANY($1) \
           AND ($2::BOOLEAN IS NULL OR is_original = $2)",
    )
    .bind(&ids)
    .bind(original)
    .fetch_all(&mut *conn)
    .await?;

    let mut category_ids: Vec<i64> = links.iter().map(|l| l.category_id).collect();
    category_ids.sort_unstable();
    category_ids.dedup();
    let category_translations = load_category_translations(conn, &category_ids).await?;

    let mut translations_by_product = group_by(translations, |t| t.product_id);
    let mut images_by_product = group_by(images, |i| i.product_id);
    let mut categories_by_product: HashMap<i64, Vec<ProductCategory>> = HashMap::new();
    for link in links {
        categories_by_product
            .entry(link.product_id)
            .or_default()
            .push(ProductCategory {
                id: link.category_id,
                translations: category_translations
                    .get(&link.category_id)
                    .cloned()
                    .unwrap_or_default(),
            });
    }

    Ok(rows
        .into_iter()
        .map(|product| {
            let mut images = images_by_product.remove(&product.id).unwrap_or_default();
            order_images(&mut images);
            ProductDetail {
                translations: translations_by_product
                    .remove(&product.id)
                    .unwrap_or_default(),
                categories: categories_by_product
                    .remove(&product.id)
                    .unwrap_or_default(),
                images,
                product,
            }
        })
        .collect())
}

fn group_by<T>(items: Vec<T>, key: impl Fn(&T) -> i64) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
}
