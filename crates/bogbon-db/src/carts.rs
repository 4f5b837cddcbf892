//! The session-scoped cart store.
//!
//! Every read goes through [`ensure_cart`], so an unseen session always gets
//! an empty cart rather than `NotFound`. Adding a product already in the cart
//! increments that line's quantity.

use bogbon_core::{CoreError, Quantity};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `carts` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartRow {
    pub id: i64,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `cart_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with the product it references.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub product_price: i64,
    pub product_stock: i32,
    pub product_type: String,
    pub product_name: String,
    pub product_deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub cart: CartRow,
    pub items: Vec<CartLineRow>,
}

impl Cart {
    /// Sum of `price * quantity` over every line, in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the sum does not fit in an `i64`.
    pub fn total(&self) -> Result<i64, CoreError> {
        self.items.iter().try_fold(0_i64, |acc, line| {
            line.product_price
                .checked_mul(i64::from(line.quantity))
                .and_then(|subtotal| acc.checked_add(subtotal))
                .ok_or_else(|| {
                    CoreError::Validation("cart total exceeds the supported range".to_string())
                })
        })
    }
}

/// Returns the session's cart, creating an empty one if none exists.
///
/// Idempotent: the unique constraint on `session_id` guarantees at most one
/// cart per session, even under concurrent first calls.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn ensure_cart(pool: &PgPool, session_id: &str) -> Result<CartRow, DbError> {
    let mut conn = pool.acquire().await?;
    upsert_cart(&mut conn, session_id).await
}

/// Adds `quantity` of a live product to the session's cart.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist or is deleted,
/// [`DbError::Invalid`] if the merged quantity overflows, or [`DbError::Sqlx`]
/// on query failure.
pub async fn add_cart_item(
    pool: &PgPool,
    session_id: &str,
    product_id: i64,
    quantity: Quantity,
) -> Result<CartItemRow, DbError> {
    let mut tx = pool.begin().await?;

    let live: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(product_id)
    .fetch_one(&mut *tx)
    .await?;
    if !live {
        return Err(DbError::NotFound);
    }

    let cart = upsert_cart(&mut *tx, session_id).await?;
    let item = sqlx::query_as::<_, CartItemRow>(
        "INSERT INTO cart_items (cart_id, product_id, quantity) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_id) DO UPDATE \
             SET quantity = cart_items.quantity + EXCLUDED.quantity \
         RETURNING id, cart_id, product_id, quantity, created_at",
    )
    .bind(cart.id)
    .bind(product_id)
    .bind(quantity.get())
    .fetch_one(&mut *tx)
    .await
    .map_err(DbError::from_tx)?;

    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(
        session_id,
        product_id,
        quantity = item.quantity,
        "cart item added"
    );
    Ok(item)
}

/// Returns the session's cart with its lines, creating an empty cart if
/// needed. Lines are ordered by item id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_cart(pool: &PgPool, session_id: &str) -> Result<Cart, DbError> {
    let mut conn = pool.acquire().await?;
    let cart = upsert_cart(&mut conn, session_id).await?;
    let items = load_lines(&mut conn, cart.id).await?;
    Ok(Cart { cart, items })
}

/// Sets the quantity of one line in the session's cart.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist or belongs to
/// another session's cart.
pub async fn update_cart_item(
    pool: &PgPool,
    session_id: &str,
    item_id: i64,
    quantity: Quantity,
) -> Result<CartItemRow, DbError> {
    let row = sqlx::query_as::<_, CartItemRow>(
        "UPDATE cart_items ci SET quantity = $3 \
         FROM carts c \
         WHERE ci.id = $2 AND ci.cart_id = c.id AND c.session_id = $1 \
         RETURNING ci.id, ci.cart_id, ci.product_id, ci.quantity, ci.created_at",
    )
    .bind(session_id)
    .bind(item_id)
    .bind(quantity.get())
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Removes one line from the session's cart.
///
/// Returns `true` if a line was removed; a missing item is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_cart_item(
    pool: &PgPool,
    session_id: &str,
    item_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "DELETE FROM cart_items ci USING carts c \
         WHERE ci.id = $2 AND ci.cart_id = c.id AND c.session_id = $1",
    )
    .bind(session_id)
    .bind(item_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes every line from the session's cart. The cart row itself is kept
/// because placed orders reference it.
///
/// Returns the number of lines removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_cart(pool: &PgPool, session_id: &str) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM cart_items ci USING carts c \
         WHERE ci.cart_id = c.id AND c.session_id = $1",
    )
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn upsert_cart(conn: &mut PgConnection, session_id: &str) -> Result<CartRow, DbError> {
    let row = sqlx::query_as::<_, CartRow>(
        "INSERT INTO carts (session_id) VALUES ($1) \
         ON CONFLICT (session_id) DO UPDATE SET session_id = EXCLUDED.session_id \
         RETURNING id, session_id, created_at, updated_at",
    )
    .bind(session_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

async fn load_lines(conn: &mut PgConnection, cart_id: i64) -> Result<Vec<CartLineRow>, DbError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT ci.id, ci.product_id, ci.quantity, ci.created_at, \
                p.price AS product_price, \
                p.stock AS product_stock, \
                p.product_type, \
                p.name AS product_name, \
                p.deleted_at AS product_deleted_at \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.id",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> CartLineRow {
        CartLineRow {
            id: 1,
            product_id: 1,
            quantity,
            created_at: Utc::now(),
            product_price: price,
            product_stock: 10,
            product_type: "plant".to_string(),
            product_name: "Monstera".to_string(),
            product_deleted_at: None,
        }
    }

    #[test]
    fn total_multiplies_price_by_quantity() {
        let cart = Cart {
            cart: CartRow {
                id: 1,
                session_id: "abc".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            items: vec![line(1500, 2), line(250, 1)],
        };
        assert_eq!(cart.total(), Ok(3250));
    }

    #[test]
    fn total_overflow_is_invalid_not_a_panic() {
        let cart = Cart {
            cart: CartRow {
                id: 1,
                session_id: "abc".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            items: vec![line(i64::MAX / 2 + 1, 2)],
        };
        assert!(matches!(cart.total(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn total_overflow_across_lines_is_invalid() {
        let cart = Cart {
            cart: CartRow {
                id: 1,
                session_id: "abc".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            items: vec![line(i64::MAX - 1, 1), line(5, 1)],
        };
        assert!(cart.total().is_err());
    }
}
