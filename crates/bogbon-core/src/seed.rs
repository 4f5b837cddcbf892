use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{
    image_url, CategoryTranslationInput, CategoryTranslations, ProductTranslationInput,
    ProductTranslations,
};
use crate::{ConfigError, CoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCategory {
    /// File-local handle products use to reference this category.
    pub key: String,
    pub translations: BTreeMap<String, CategoryTranslationInput>,
}

impl SeedCategory {
    /// # Errors
    ///
    /// Returns [`CoreError`] if the translation set is invalid.
    pub fn translations(&self) -> Result<CategoryTranslations, CoreError> {
        CategoryTranslations::new(self.translations.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedImage {
    pub url: String,
    #[serde(default)]
    pub is_original: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedProduct {
    pub price: i64,
    pub stock: i32,
    #[serde(rename = "type")]
    pub product_type: String,
    /// Category keys declared in the same file.
    #[serde(default)]
    pub categories: Vec<String>,
    pub translations: BTreeMap<String, ProductTranslationInput>,
    #[serde(default)]
    pub images: Vec<SeedImage>,
}

impl SeedProduct {
    /// # Errors
    ///
    /// Returns [`CoreError`] if the translation set is invalid.
    pub fn translations(&self) -> Result<ProductTranslations, CoreError> {
        ProductTranslations::new(self.translations.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// Load and validate a catalog seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut keys = HashSet::new();

    for category in &catalog.categories {
        if category.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category key must be non-empty".to_string(),
            ));
        }
        if !keys.insert(category.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category key: '{}'",
                category.key
            )));
        }
        category.translations().map_err(|e| {
            ConfigError::Validation(format!("category '{}': {e}", category.key))
        })?;
    }

    for (index, product) in catalog.products.iter().enumerate() {
        let translations = product
            .translations()
            .map_err(|e| ConfigError::Validation(format!("product #{index}: {e}")))?;
        let label = &translations.english().name;

        if product.price < 0 || product.stock < 0 {
            return Err(ConfigError::Validation(format!(
                "product '{label}' has negative price or stock"
            )));
        }
        if let Some(missing) = product
            .categories
            .iter()
            .find(|key| !keys.contains(key.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "product '{label}' references unknown category '{missing}'"
            )));
        }
        for image in &product.images {
            image_url(&image.url)
                .map_err(|e| ConfigError::Validation(format!("product '{label}': {e}")))?;
        }
    }

    Ok(())
}
