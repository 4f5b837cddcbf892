//! Product filter predicates.
//!
//! All predicates are optional and combine with AND. `category_ids` is the
//! one OR-predicate: a product matches when it belongs to any listed category.

use crate::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Inclusive lower price bound, in minor currency units.
    pub min_price: Option<i64>,
    /// Inclusive upper price bound, in minor currency units.
    pub max_price: Option<i64>,
    pub product_type: Option<String>,
    /// When set, only products with `stock > 0` match.
    pub in_stock: bool,
    pub category_ids: Vec<i64>,
    /// Case-insensitive substring searched in names and descriptions.
    pub q: Option<String>,
    /// Restricts each product's image list to originals (`true`) or resized
    /// variants (`false`). Does not exclude products.
    pub original: Option<bool>,
}

impl ProductFilter {
    /// # Errors
    ///
    /// Returns [`CoreError::Negative`] if either price bound is below zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(value) = self.min_price.filter(|v| *v < 0) {
            return Err(CoreError::Negative {
                field: "min_price",
                value,
            });
        }
        if let Some(value) = self.max_price.filter(|v| *v < 0) {
            return Err(CoreError::Negative {
                field: "max_price",
                value,
            });
        }
        Ok(())
    }

    /// `true` when both bounds are present and `min_price > max_price`, so
    /// nothing can match.
    #[must_use]
    pub fn has_empty_price_range(&self) -> bool {
        matches!((self.min_price, self.max_price), (Some(min), Some(max)) if min > max)
    }

    /// The `ILIKE` pattern for the free-text predicate. `None` when the query
    /// is absent or blank.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.q.as_deref().and_then(contains_pattern)
    }

    /// Normalized type predicate; blank strings mean "no predicate".
    #[must_use]
    pub fn type_predicate(&self) -> Option<&str> {
        self.product_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Build a substring `ILIKE` pattern with `%`, `_` and backslash escaped.
///
/// Returns `None` for blank input.
#[must_use]
pub fn contains_pattern(q: &str) -> Option<String> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Parse a comma-separated list of category ids, e.g. `"1,4, 7"`.
///
/// Empty segments are skipped, so `""` yields an empty list.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if any segment is not an integer.
pub fn parse_category_ids(raw: &str) -> Result<Vec<i64>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| CoreError::Validation(format!("invalid category id '{s}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_has_no_predicates() {
        let f = ProductFilter::default();
        assert!(f.validate().is_ok());
        assert!(!f.has_empty_price_range());
        assert!(f.search_pattern().is_none());
        assert!(f.type_predicate().is_none());
        assert!(f.category_ids.is_empty());
    }

    #[test]
    fn inverted_price_range_is_empty() {
        let f = ProductFilter {
            min_price: Some(100),
            max_price: Some(50),
            ..Default::default()
        };
        assert!(f.validate().is_ok());
        assert!(f.has_empty_price_range());
    }

    #[test]
    fn equal_bounds_are_not_empty() {
        let f = ProductFilter {
            min_price: Some(50),
            max_price: Some(50),
            ..Default::default()
        };
        assert!(!f.has_empty_price_range());
    }

    #[test]
    fn negative_min_price_is_invalid() {
        let f = ProductFilter {
            min_price: Some(-1),
            ..Default::default()
        };
        assert_eq!(
            f.validate(),
            Err(CoreError::Negative {
                field: "min_price",
                value: -1
            })
        );
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let f = ProductFilter {
            q: Some(" 50%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(f.search_pattern().as_deref(), Some("%50\\%\\_off%"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let f = ProductFilter {
            q: Some("   ".to_string()),
            product_type: Some(String::new()),
            ..Default::default()
        };
        assert!(f.search_pattern().is_none());
        assert!(f.type_predicate().is_none());
    }

    #[test]
    fn parse_category_ids_accepts_spaces_and_empty_segments() {
        assert_eq!(parse_category_ids("1, 4,,7").unwrap(), vec![1, 4, 7]);
        assert!(parse_category_ids("").unwrap().is_empty());
    }

    #[test]
    fn parse_category_ids_rejects_garbage() {
        let err = parse_category_ids("1,two").unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation("invalid category id 'two'".to_string())
        );
    }
}
