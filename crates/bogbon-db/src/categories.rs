//! Database operations for `categories` and `category_translations`.

use std::collections::HashMap;

use bogbon_core::{contains_pattern, CategoryTranslations};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A row from the `category_translations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryTranslationRow {
    pub id: i64,
    pub category_id: i64,
    pub language_code: String,
    pub name: String,
}

/// A category with all of its translation rows, ordered by language code.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub translations: Vec<CategoryTranslationRow>,
}

impl Category {
    /// The translated name for `language_code`, if present.
    #[must_use]
    pub fn name_in(&self, language_code: &str) -> Option<&str> {
        self.translations
            .iter()
            .find(|t| t.language_code == language_code)
            .map(|t| t.name.as_str())
    }
}

/// Creates a category and its translations in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is persisted.
pub async fn create_category(
    pool: &PgPool,
    translations: &CategoryTranslations,
) -> Result<Category, DbError> {
    let mut tx = pool.begin().await?;
    let id = insert_category(&mut *tx, translations).await?;
    tx.commit().await?;

    tracing::debug!(category_id = id, "category created");
    let mut conn = pool.acquire().await?;
    fetch_category(&mut conn, id).await?.ok_or(DbError::NotFound)
}

/// Lists categories ordered by id.
///
/// When `q` is non-blank, only categories with a translation name containing
/// `q` (case-insensitive) are returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool, q: Option<&str>) -> Result<Vec<Category>, DbError> {
    let pattern = q.and_then(contains_pattern);

    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT c.id, c.created_at, c.updated_at \
         FROM categories c \
         WHERE ($1::TEXT IS NULL OR EXISTS ( \
             SELECT 1 FROM category_translations ct \
             WHERE ct.category_id = c.id AND ct.name ILIKE $1)) \
         ORDER BY c.id",
    )
    .bind(pattern)
    .fetch_all(&mut *conn)
    .await?;

    attach_translations(&mut conn, rows).await
}

/// Returns one category, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<Category>, DbError> {
    let mut conn = pool.acquire().await?;
    fetch_category(&mut conn, id).await
}

/// Replaces every translation of a category with `translations`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist, or
/// [`DbError::Sqlx`] on query failure. The prior translations survive any
/// failure.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    translations: &CategoryTranslations,
) -> Result<Category, DbError> {
    let mut tx = pool.begin().await?;

    let touched = sqlx::query("UPDATE categories SET updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if touched == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query("DELETE FROM category_translations WHERE category_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_translations(&mut *tx, id, translations).await?;

    let category = fetch_category(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
    tx.commit().await?;
    Ok(category)
}

/// Deletes a category; translations and product links cascade.
///
/// Returns `true` if a row was removed. Deleting a missing category is not an
/// error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_category(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn insert_category(
    conn: &mut PgConnection,
    translations: &CategoryTranslations,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar("INSERT INTO categories DEFAULT VALUES RETURNING id")
        .fetch_one(&mut *conn)
        .await?;
    insert_translations(conn, id, translations).await?;
    Ok(id)
}

async fn insert_translations(
    conn: &mut PgConnection,
    category_id: i64,
    translations: &CategoryTranslations,
) -> Result<(), DbError> {
    for (language_code, translation) in translations.iter() {
        sqlx::query(
            "INSERT INTO category_translations (category_id, language_code, name) \
             VALUES ($1, $2, $3)",
        )
        .bind(category_id)
        .bind(language_code)
        .bind(&translation.name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn fetch_category(conn: &mut PgConnection, id: i64) -> Result<Option<Category>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, created_at, updated_at FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(attach_translations(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Batch-loads translations for the given categories, preserving row order.
async fn attach_translations(
    conn: &mut PgConnection,
    rows: Vec<CategoryRow>,
) -> Result<Vec<Category>, DbError> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut by_category = load_translations(conn, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| Category {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            translations: by_category.remove(&row.id).unwrap_or_default(),
        })
        .collect())
}

pub(crate) async fn load_translations(
    conn: &mut PgConnection,
    category_ids: &[i64],
) -> Result<HashMap<i64, Vec<CategoryTranslationRow>>, DbError> {
    if category_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, CategoryTranslationRow>(
        "SELECT id, category_id, language_code, name \
         FROM category_translations \
         WHERE category_id = ANY($1) \
         ORDER BY category_id, language_code",
    )
    .bind(category_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<CategoryTranslationRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.category_id).or_default().push(row);
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(code: &str, name: &str) -> CategoryTranslationRow {
        CategoryTranslationRow {
            id: 1,
            category_id: 1,
            language_code: code.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn name_in_finds_matching_language() {
        let category = Category {
            id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            translations: vec![translation("en", "Plants"), translation("uz", "O'simliklar")],
        };
        assert_eq!(category.name_in("uz"), Some("O'simliklar"));
        assert_eq!(category.name_in("fr"), None);
    }
}
