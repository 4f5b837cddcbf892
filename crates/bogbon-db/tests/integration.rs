//! Offline unit tests for bogbon-db pool configuration and row types.
//! These tests do not require a live database connection.

use bogbon_core::{AppConfig, CoreError, Environment};
use bogbon_db::{Cart, CartLineRow, CartRow, DbError, OrderLineRow, PoolConfig};
use chrono::Utc;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        catalog_path: PathBuf::from("./config/catalog.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        session_cookie_name: "session_id".to_string(),
        session_max_age_secs: 60,
        cors_origins: Vec::new(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn empty_cart_total_is_zero() {
    let cart = Cart {
        cart: CartRow {
            id: 1,
            session_id: "abc".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        items: Vec::new(),
    };
    assert_eq!(cart.total(), Ok(0));
}

/// Compile-time smoke test: a cart line carries the product display fields.
#[test]
fn cart_line_row_has_expected_fields() {
    let row = CartLineRow {
        id: 3,
        product_id: 7,
        quantity: 2,
        created_at: Utc::now(),
        product_price: 1500,
        product_stock: 4,
        product_type: "plant".to_string(),
        product_name: "Monstera".to_string(),
        product_deleted_at: None,
    };
    assert_eq!(row.product_id, 7);
    assert_eq!(row.quantity, 2);
    assert!(row.product_deleted_at.is_none());
}

#[test]
fn order_line_row_tolerates_deleted_products() {
    let row = OrderLineRow {
        id: 1,
        order_id: 10,
        product_id: 9,
        quantity: 1,
        product_price: 500,
        product_type: "service".to_string(),
        product_name: "Lawn mowing".to_string(),
        product_deleted_at: Some(Utc::now()),
    };
    assert_eq!(row.order_id, 10);
    assert!(row.product_deleted_at.is_some());
}

#[test]
fn db_error_messages_are_stable() {
    assert_eq!(DbError::NotFound.to_string(), "record not found");
    assert_eq!(DbError::EmptyCart.to_string(), "cart is empty");
    assert_eq!(
        DbError::Conflict.to_string(),
        "concurrent modification conflict"
    );
    let invalid = DbError::from(CoreError::MissingEnglishTranslation);
    assert!(matches!(
        invalid,
        DbError::Invalid(CoreError::MissingEnglishTranslation)
    ));
}
