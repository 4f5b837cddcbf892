use std::collections::HashMap;

use bogbon_core::{image_url, CatalogFile, CoreError, ProductDraft};
use sqlx::{PgConnection, PgPool};

use crate::categories::insert_category;
use crate::products::{insert_image, insert_product};
use crate::DbError;

/// Counts of rows inserted by [`seed_catalog`], plus entries skipped because
/// they were already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub images: usize,
    pub existing_categories: usize,
    pub existing_products: usize,
}

/// Insert a parsed catalog file: categories first, then products linked to
/// them by key, then product images.
///
/// Re-running with the same file inserts nothing. A category is matched by its
/// English name, a product by its English name and type among live products;
/// matched entries are left as they are and their images are not re-added.
///
/// Everything runs inside a single transaction; if any insert fails the whole
/// catalog is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Invalid`] if an entry fails domain validation or
/// references an undeclared category key, or [`DbError::Sqlx`] if any database
/// operation fails.
pub async fn seed_catalog(pool: &PgPool, catalog: &CatalogFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    let mut ids_by_key: HashMap<&str, i64> = HashMap::new();

    for category in &catalog.categories {
        let translations = category.translations()?;
        let id = match find_category(&mut *tx, &translations.english().name).await? {
            Some(id) => {
                summary.existing_categories += 1;
                id
            }
            None => {
                summary.categories += 1;
                insert_category(&mut *tx, &translations).await?
            }
        };
        ids_by_key.insert(category.key.as_str(), id);
    }

    for product in &catalog.products {
        let category_ids = product
            .categories
            .iter()
            .map(|key| {
                ids_by_key.get(key.as_str()).copied().ok_or_else(|| {
                    CoreError::Validation(format!("unknown category key '{key}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let draft = ProductDraft::new(
            product.price,
            product.stock,
            &product.product_type,
            Some(category_ids),
            product.translations()?,
        )?;
        if find_product(&mut *tx, &draft).await?.is_some() {
            summary.existing_products += 1;
            continue;
        }
        let product_id = insert_product(&mut *tx, &draft).await?;
        summary.products += 1;

        for image in &product.images {
            insert_image(&mut *tx, product_id, image_url(&image.url)?, image.is_original).await?;
            summary.images += 1;
        }
    }

    tx.commit().await?;
    tracing::info!(
        categories = summary.categories,
        products = summary.products,
        images = summary.images,
        existing_categories = summary.existing_categories,
        existing_products = summary.existing_products,
        "catalog seeded"
    );
    Ok(summary)
}

async fn find_category(
    conn: &mut PgConnection,
    english_name: &str,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar(
        "SELECT category_id FROM category_translations \
         WHERE language_code = 'en' AND name = $1 \
         ORDER BY category_id \
         LIMIT 1",
    )
    .bind(english_name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

async fn find_product(
    conn: &mut PgConnection,
    draft: &ProductDraft,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar(
        "SELECT id FROM products \
         WHERE name = $1 AND product_type = $2 AND deleted_at IS NULL \
         ORDER BY id \
         LIMIT 1",
    )
    .bind(draft.legacy_name())
    .bind(draft.product_type())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}
