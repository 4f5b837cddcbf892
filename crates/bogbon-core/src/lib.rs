pub mod app_config;
pub mod catalog;
pub mod config;
pub mod filter;
pub mod seed;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    image_url, order_images, CategoryTranslationInput, CategoryTranslations, ImageOrdering,
    NamedTranslation, ProductDraft, ProductTranslationInput, ProductTranslations, Quantity,
    Translations, DEFAULT_LANGUAGE, MAX_IMAGE_URL_LEN,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use filter::{contains_pattern, parse_category_ids, ProductFilter};
pub use seed::{load_catalog, parse_catalog, CatalogFile, SeedCategory, SeedImage, SeedProduct};

/// Request-data validation failures. Every variant surfaces to callers as
/// invalid input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("an \"en\" translation with a non-empty name is required")]
    MissingEnglishTranslation,
    #[error("language code must be 1-10 characters, got '{0}'")]
    InvalidLanguageCode(String),
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i64 },
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}
