//! List request parameters
//!
//! [`RawListQuery`] is what the query string deserialises into: every value
//! is kept as text so that malformed numbers surface as field errors instead
//! of an opaque extractor rejection. [`RawListQuery::from_pairs`] builds one
//! from raw query-string pairs, remembering repeated fields.
//! [`RawListQuery::validate`] turns it into an immutable [`QueryParameters`],
//! collecting every field error first.
//!
//! # Example
//!
//! ```rust
//! use bglist_service::listing::{ColumnValidator, ListingRules, RawListQuery};
//! use bglist_service::record::{BoardGameColumn, SortOrder};
//!
//! let validator = ColumnValidator::<BoardGameColumn>::all();
//! let rules = ListingRules::default();
//!
//! let params = RawListQuery::default()
//!     .with_page_index("2")
//!     .with_page_size("5")
//!     .with_sort_column("Year")
//!     .with_sort_order("DESC")
//!     .validate(&rules, &validator)
//!     .unwrap();
//!
//! assert_eq!(params.sort_column(), BoardGameColumn::Year);
//! assert_eq!(params.sort_order(), SortOrder::Desc);
//! assert_eq!(params.offset(), 10);
//! assert_eq!(params.filter_text(), None);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ListingConfig;
use crate::listing::validators::{sort_order_rejection_message, ColumnValidator};
use crate::record::{SortColumn, SortOrder};
use crate::responses::{codes, ValidationError};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query-string field names
pub mod fields {
    pub const PAGE_INDEX: &str = "pageIndex";
    pub const PAGE_SIZE: &str = "pageSize";
    pub const SORT_COLUMN: &str = "sortColumn";
    pub const SORT_ORDER: &str = "sortOrder";
    pub const FILTER_QUERY: &str = "filterQuery";
    /// Accepted in place of `filterQuery`
    pub const FILTER_TEXT: &str = "filterText";
}

/// Paging defaults and bounds applied during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRules {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub default_sort_column: String,
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            default_sort_column: "Name".to_string(),
        }
    }
}

impl From<&ListingConfig> for ListingRules {
    fn from(config: &ListingConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            default_sort_column: config.default_sort_column.clone(),
        }
    }
}

/// Unvalidated list request, as read from the query string
///
/// An empty value (`?sortOrder=`) is treated the same as an absent one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_index: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,

    /// Free-text name filter; `filterText` is accepted as an alias
    #[serde(alias = "filterText", skip_serializing_if = "Option::is_none")]
    pub filter_query: Option<String>,

    /// Fields that appeared more than once in the query string
    #[serde(skip)]
    repeated: Vec<&'static str>,
}

impl RawListQuery {
    /// Build from query-string pairs in request order
    ///
    /// Unknown keys are ignored. A field given more than once, including
    /// `filterQuery` together with `filterText`, keeps its first value and is
    /// reported as [`codes::DUPLICATE_FIELD`] by [`validate`](Self::validate).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let (field, slot) = match key.as_ref() {
                fields::PAGE_INDEX => (fields::PAGE_INDEX, &mut raw.page_index),
                fields::PAGE_SIZE => (fields::PAGE_SIZE, &mut raw.page_size),
                fields::SORT_COLUMN => (fields::SORT_COLUMN, &mut raw.sort_column),
                fields::SORT_ORDER => (fields::SORT_ORDER, &mut raw.sort_order),
                fields::FILTER_QUERY | fields::FILTER_TEXT => {
                    (fields::FILTER_QUERY, &mut raw.filter_query)
                }
                _ => continue,
            };

            if slot.is_none() {
                *slot = Some(value.into());
            } else if !raw.repeated.contains(&field) {
                raw.repeated.push(field);
            }
        }
        raw
    }

    #[must_use]
    pub fn with_page_index(mut self, value: impl Into<String>) -> Self {
        self.page_index = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, value: impl Into<String>) -> Self {
        self.page_size = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_sort_column(mut self, value: impl Into<String>) -> Self {
        self.sort_column = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_sort_order(mut self, value: impl Into<String>) -> Self {
        self.sort_order = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, value: impl Into<String>) -> Self {
        self.filter_query = Some(value.into());
        self
    }

    /// Validate and normalise into [`QueryParameters`]
    ///
    /// All fields are checked; the returned [`ValidationError`] lists every
    /// offending field, not just the first.
    pub fn validate<C: SortColumn>(
        &self,
        rules: &ListingRules,
        columns: &ColumnValidator<C>,
    ) -> Result<QueryParameters<C>, ValidationError> {
        let mut errors = ValidationError::default();

        for field in &self.repeated {
            errors.add_field_error(
                *field,
                codes::DUPLICATE_FIELD,
                format!("The field {} may only be given once.", field),
            );
        }

        let page_index = parse_bounded(
            &mut errors,
            fields::PAGE_INDEX,
            present(&self.page_index),
            0,
            0,
            u32::MAX,
        );
        let page_size = parse_bounded(
            &mut errors,
            fields::PAGE_SIZE,
            present(&self.page_size),
            rules.default_page_size,
            1,
            rules.max_page_size,
        );

        let column_name =
            present(&self.sort_column).unwrap_or(rules.default_sort_column.as_str());
        let sort_column = columns.resolve(column_name);
        if sort_column.is_none() {
            errors.add_field_error(
                fields::SORT_COLUMN,
                codes::INVALID_COLUMN,
                columns.rejection_message(),
            );
        }

        let sort_order = match present(&self.sort_order) {
            None => Some(SortOrder::default()),
            Some(value) => SortOrder::parse(value),
        };
        if sort_order.is_none() {
            errors.add_field_error(
                fields::SORT_ORDER,
                codes::INVALID_SORT_ORDER,
                sort_order_rejection_message(),
            );
        }

        match (page_index, page_size, sort_column, sort_order) {
            (Some(page_index), Some(page_size), Some(sort_column), Some(sort_order))
                if !errors.has_errors() =>
            {
                Ok(QueryParameters {
                    filter_text: present(&self.filter_query).map(str::to_owned),
                    sort_column,
                    sort_order,
                    page_index,
                    page_size,
                })
            }
            _ => Err(errors),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse an integer field, recording a field error on failure
fn parse_bounded(
    errors: &mut ValidationError,
    field: &str,
    value: Option<&str>,
    default: u32,
    min: u32,
    max: u32,
) -> Option<u32> {
    let Some(value) = value else {
        return Some(default);
    };

    let out_of_range = format!("The field {} must be between {} and {}.", field, min, max);

    match value.parse::<i64>() {
        Ok(n) if n >= i64::from(min) && n <= i64::from(max) => u32::try_from(n).ok(),
        Ok(_) => {
            errors.add_field_error(field, codes::OUT_OF_RANGE, out_of_range);
            None
        }
        Err(_) if is_integer_literal(value) => {
            // Digits only, but too large for i64
            errors.add_field_error(field, codes::OUT_OF_RANGE, out_of_range);
            None
        }
        Err(_) if value.parse::<f64>().is_ok() => {
            errors.add_field_error(
                field,
                codes::NOT_A_NUMBER,
                format!("The value '{}' is not valid for {}.", value, field),
            );
            None
        }
        Err(_) => {
            errors.add_field_error(
                field,
                codes::NOT_A_NUMBER,
                format!("The field {} must be a number.", field),
            );
            None
        }
    }
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A validated list request
///
/// Only [`RawListQuery::validate`] builds one; it is immutable afterwards.
/// Two values with equal fields produce equal cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryParameters<C> {
    filter_text: Option<String>,
    sort_column: C,
    sort_order: SortOrder,
    page_index: u32,
    page_size: u32,
}

impl<C: SortColumn> QueryParameters<C> {
    /// Name filter; `None` when the request had no (or an empty) filter
    pub fn filter_text(&self) -> Option<&str> {
        self.filter_text.as_deref()
    }

    pub fn sort_column(&self) -> C {
        self.sort_column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Zero-based page number
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of records skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.page_size)
    }

    /// Canonical query-string pairs, used to rebuild the request's link
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (fields::PAGE_INDEX, self.page_index.to_string()),
            (fields::PAGE_SIZE, self.page_size.to_string()),
            (fields::SORT_COLUMN, self.sort_column.name().to_string()),
            (fields::SORT_ORDER, self.sort_order.as_str().to_string()),
        ];
        if let Some(filter) = &self.filter_text {
            pairs.push((fields::FILTER_QUERY, filter.clone()));
        }
        pairs
    }
}
