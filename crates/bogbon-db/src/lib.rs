use bogbon_core::{AppConfig, CoreError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/bogbon-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("cart is empty")]
    EmptyCart,
    #[error("concurrent modification conflict")]
    Conflict,
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Like `From<sqlx::Error>`, but classifies serialization failures,
    /// deadlocks and unique violations as [`DbError::Conflict`], and numeric
    /// overflow or over-long strings as [`DbError::Invalid`].
    pub(crate) fn from_tx(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = error {
            if let Some(kind) = classify_sqlstate(db_err.code().as_deref()) {
                return kind;
            }
        }
        Self::Sqlx(error)
    }
}

fn classify_sqlstate(code: Option<&str>) -> Option<DbError> {
    match code? {
        "40001" | "40P01" | "23505" => Some(DbError::Conflict),
        "22003" => Some(DbError::Invalid(CoreError::Validation(
            "numeric value out of range".to_string(),
        ))),
        "22001" => Some(DbError::Invalid(CoreError::Validation(
            "value too long for its column".to_string(),
        ))),
        _ => None,
    }
}

pub mod carts;
pub mod categories;
pub mod filter;
pub mod orders;
pub mod products;
pub mod seed;

pub use carts::{
    add_cart_item, clear_cart, delete_cart_item, ensure_cart, get_cart, update_cart_item, Cart,
    CartItemRow, CartLineRow, CartRow,
};
pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category, Category,
    CategoryTranslationRow,
};
pub use filter::filter_products;
pub use orders::{
    create_order_from_cart, delete_orders_for_session, get_latest_order_for_session, list_orders,
    update_order_paid, Order, OrderLineRow, OrderRow,
};
pub use products::{
    add_product_image, create_product, delete_product, delete_product_image, get_product,
    update_product, ProductCategory, ProductDetail, ProductImageRow, ProductRow,
    ProductTranslationRow,
};
pub use seed::{seed_catalog, SeedSummary};

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database;
    // treat absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}
