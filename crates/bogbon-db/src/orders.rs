//! Orders and the cart → order conversion workflow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub session_id: String,
    pub cart_id: i64,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// An order line joined with the current display data of its product.
///
/// `quantity` is the value copied at checkout; the `product_*` fields are
/// resolved at read time and include soft-deleted products.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderLineRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product_price: i64,
    pub product_type: String,
    pub product_name: String,
    pub product_deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order: OrderRow,
    pub items: Vec<OrderLineRow>,
}

const ORDER_COLUMNS: &str = "id, session_id, cart_id, is_paid, created_at";

/// Converts the session's cart into an unpaid order and empties the cart.
///
/// The cart row is locked for the duration of the transaction, so concurrent
/// checkouts for one session serialize: the first converts the lines, the
/// second observes an empty cart.
///
/// # Errors
///
/// Returns [`DbError::EmptyCart`] if the session has no cart or no lines,
/// [`DbError::Conflict`] on a serialization failure or deadlock, or
/// [`DbError::Sqlx`] on any other failure. Nothing is persisted on error.
pub async fn create_order_from_cart(pool: &PgPool, session_id: &str) -> Result<Order, DbError> {
    let mut tx = pool.begin().await?;

    let cart_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM carts WHERE session_id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from_tx)?;
    let Some(cart_id) = cart_id else {
        return Err(DbError::EmptyCart);
    };

    let line_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from_tx)?;
    if line_count == 0 {
        return Err(DbError::EmptyCart);
    }

    let order = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (session_id, cart_id) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(session_id)
    .bind(cart_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(DbError::from_tx)?;

    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity) \
         SELECT $1, product_id, quantity FROM cart_items \
         WHERE cart_id = $2 \
         ORDER BY id",
    )
    .bind(order.id)
    .bind(cart_id)
    .execute(&mut *tx)
    .await
    .map_err(DbError::from_tx)?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from_tx)?;

    let items = load_lines(&mut *tx, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    tx.commit().await.map_err(DbError::from_tx)?;

    tracing::info!(
        session_id,
        order_id = order.id,
        lines = items.len(),
        "order created from cart"
    );
    Ok(Order { order, items })
}

/// Sets the paid flag of an order. No other field can change.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn update_order_paid(pool: &PgPool, id: i64, is_paid: bool) -> Result<Order, DbError> {
    let mut conn = pool.acquire().await?;
    let order = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET is_paid = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(is_paid)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?;

    let items = load_lines(&mut conn, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    Ok(Order { order, items })
}

/// Returns the session's most recent order, or `None` if it has none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_latest_order_for_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<Order>, DbError> {
    let mut conn = pool.acquire().await?;
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE session_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(order) = row else {
        return Ok(None);
    };
    let items = load_lines(&mut conn, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    Ok(Some(Order { order, items }))
}

/// Lists every order with its lines, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>, DbError> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|o| o.id).collect();
    let mut lines = load_lines(&mut conn, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|order| Order {
            items: lines.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

/// Deletes every order placed by a session; lines cascade.
///
/// Returns the number of orders removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_orders_for_session(pool: &PgPool, session_id: &str) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

async fn load_lines(
    conn: &mut PgConnection,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<OrderLineRow>>, DbError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, OrderLineRow>(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, \
                p.price AS product_price, \
                p.product_type, \
                p.name AS product_name, \
                p.deleted_at AS product_deleted_at \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = ANY($1) \
         ORDER BY oi.order_id, oi.id",
    )
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<OrderLineRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}
