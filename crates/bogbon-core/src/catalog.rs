//! Catalog value types: per-language translation sets, cart quantities, and
//! the display ordering of product images.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Language code whose translation is mandatory and backs the legacy
/// single-language product columns.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Upper bound matching the `language_code VARCHAR(10)` columns.
const MAX_LANGUAGE_CODE_LEN: usize = 10;

/// A translation entry that carries a display name.
pub trait NamedTranslation {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTranslationInput {
    pub name: String,
}

impl NamedTranslation for CategoryTranslationInput {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTranslationInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_info: String,
}

impl NamedTranslation for ProductTranslationInput {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A validated language-code → translation map.
///
/// Construction guarantees an `"en"` entry with a non-empty name and that
/// every language code fits the schema. Non-English entries are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Translations<T> {
    entries: BTreeMap<String, T>,
}

pub type CategoryTranslations = Translations<CategoryTranslationInput>;
pub type ProductTranslations = Translations<ProductTranslationInput>;

impl<T: NamedTranslation> Translations<T> {
    /// Validate a raw translation map.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingEnglishTranslation`] when `"en"` is absent or
    /// has a blank name, and [`CoreError::InvalidLanguageCode`] for empty or
    /// over-long language codes.
    pub fn new(entries: BTreeMap<String, T>) -> Result<Self, CoreError> {
        if let Some(bad) = entries
            .keys()
            .find(|code| code.trim().is_empty() || code.len() > MAX_LANGUAGE_CODE_LEN)
        {
            return Err(CoreError::InvalidLanguageCode(bad.clone()));
        }

        match entries.get(DEFAULT_LANGUAGE) {
            Some(en) if !en.name().trim().is_empty() => Ok(Self { entries }),
            _ => Err(CoreError::MissingEnglishTranslation),
        }
    }

    /// The mandatory English entry.
    #[must_use]
    pub fn english(&self) -> &T {
        // Presence is checked in `new`; the map is never mutated afterwards.
        &self.entries[DEFAULT_LANGUAGE]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(code, t)| (code.as_str(), t))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Upper bound matching the `product_type VARCHAR(20)` column.
const MAX_PRODUCT_TYPE_LEN: usize = 20;

/// Validated product fields for create and update.
///
/// `category_ids: None` means "leave category links untouched" on update and
/// "no categories" on create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    price: i64,
    stock: i32,
    product_type: String,
    category_ids: Option<Vec<i64>>,
    translations: ProductTranslations,
}

impl ProductDraft {
    /// # Errors
    ///
    /// Returns [`CoreError`] for negative price or stock, or a blank or
    /// over-long product type.
    pub fn new(
        price: i64,
        stock: i32,
        product_type: &str,
        category_ids: Option<Vec<i64>>,
        translations: ProductTranslations,
    ) -> Result<Self, CoreError> {
        if price < 0 {
            return Err(CoreError::Negative {
                field: "price",
                value: price,
            });
        }
        if stock < 0 {
            return Err(CoreError::Negative {
                field: "stock",
                value: i64::from(stock),
            });
        }
        let product_type = product_type.trim();
        if product_type.is_empty() || product_type.len() > MAX_PRODUCT_TYPE_LEN {
            return Err(CoreError::Validation(
                "type must be 1-20 characters".to_string(),
            ));
        }
        let category_ids = category_ids.map(|mut ids| {
            ids.sort_unstable();
            ids.dedup();
            ids
        });

        Ok(Self {
            price,
            stock,
            product_type: product_type.to_string(),
            category_ids,
            translations,
        })
    }

    #[must_use]
    pub fn price(&self) -> i64 {
        self.price
    }

    #[must_use]
    pub fn stock(&self) -> i32 {
        self.stock
    }

    #[must_use]
    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    #[must_use]
    pub fn category_ids(&self) -> Option<&[i64]> {
        self.category_ids.as_deref()
    }

    #[must_use]
    pub fn translations(&self) -> &ProductTranslations {
        &self.translations
    }

    /// Legacy single-language name, taken from the English translation.
    #[must_use]
    pub fn legacy_name(&self) -> &str {
        &self.translations.english().name
    }

    /// Legacy single-language description, taken from the English translation.
    #[must_use]
    pub fn legacy_description(&self) -> &str {
        &self.translations.english().description
    }
}

/// A cart or order line quantity, always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidQuantity`] for values below 1 or above
    /// `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, CoreError> {
        match i32::try_from(value) {
            Ok(v) if v >= 1 => Ok(Self(v)),
            _ => Err(CoreError::InvalidQuantity(value)),
        }
    }

    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

/// Upper bound matching the `product_images.url VARCHAR(255)` column.
pub const MAX_IMAGE_URL_LEN: usize = 255;

/// Trims an image url and checks it fits the column.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for a blank url or one longer than
/// [`MAX_IMAGE_URL_LEN`] characters.
pub fn image_url(url: &str) -> Result<&str, CoreError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CoreError::Validation(
            "image url must be non-empty".to_string(),
        ));
    }
    if url.chars().count() > MAX_IMAGE_URL_LEN {
        return Err(CoreError::Validation(format!(
            "image url must be at most {MAX_IMAGE_URL_LEN} characters"
        )));
    }
    Ok(url)
}

/// Access to the two fields that decide image display order.
pub trait ImageOrdering {
    fn is_original(&self) -> bool;
    fn image_id(&self) -> i64;
}

/// Sort images so originals come first, ties broken by ascending id.
pub fn order_images<I: ImageOrdering>(images: &mut [I]) {
    images.sort_by_key(|img| (!img.is_original(), img.image_id()));
}
