//! Cache key derivation
//!
//! Keys are an explicit, versioned encoding of the fields that shape a result
//! page. The filter is length-prefixed so any character it contains,
//! delimiters included, cannot make two different requests collide.
//!
//! ```text
//! v1|f12:terraforming|c:Name|o:ASC|i:0|s:10
//! v1|f-|c:Year|o:DESC|i:3|s:25
//! ```

use std::fmt;

use crate::listing::params::QueryParameters;
use crate::record::SortColumn;

const KEY_VERSION: &str = "v1";

/// Lookup key of one result page in the [`ResultCache`](crate::cache::ResultCache)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a validated request
    ///
    /// Pure: equal parameters always give equal keys.
    pub fn derive<C: SortColumn>(params: &QueryParameters<C>) -> Self {
        let filter = match params.filter_text() {
            Some(text) => format!("f{}:{}", text.len(), text),
            None => "f-".to_string(),
        };

        Self(format!(
            "{}|{}|c:{}|o:{}|i:{}|s:{}",
            KEY_VERSION,
            filter,
            params.sort_column().name(),
            params.sort_order().as_str(),
            params.page_index(),
            params.page_size(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::params::{ListingRules, RawListQuery};
    use crate::listing::validators::ColumnValidator;
    use crate::record::BoardGameColumn;

    fn params(raw: RawListQuery) -> QueryParameters<BoardGameColumn> {
        raw.validate(&ListingRules::default(), &ColumnValidator::all())
            .unwrap()
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::derive(&params(
            RawListQuery::default()
                .with_filter("terraforming")
                .with_page_size("10"),
        ));
        assert_eq!(key.as_str(), "v1|f12:terraforming|c:Name|o:ASC|i:0|s:10");

        let key = CacheKey::derive(&params(
            RawListQuery::default()
                .with_sort_column("Year")
                .with_sort_order("DESC")
                .with_page_index("3")
                .with_page_size("25"),
        ));
        assert_eq!(key.to_string(), "v1|f-|c:Year|o:DESC|i:3|s:25");
    }

    #[test]
    fn test_equal_fields_give_equal_keys() {
        // Same values, built independently and in a different order
        let a = params(
            RawListQuery::default()
                .with_filter("mars")
                .with_sort_order("DESC")
                .with_page_index("1"),
        );
        let b = params(
            RawListQuery::default()
                .with_page_index("1")
                .with_sort_order("DESC")
                .with_filter("mars"),
        );
        assert_eq!(CacheKey::derive(&a), CacheKey::derive(&b));
        assert_eq!(CacheKey::derive(&a), CacheKey::derive(&a.clone()));
    }

    #[test]
    fn test_defaults_and_explicit_values_share_a_key() {
        let implicit = params(RawListQuery::default());
        let explicit = params(
            RawListQuery::default()
                .with_page_index("0")
                .with_page_size("10")
                .with_sort_column("Name")
                .with_sort_order("ASC"),
        );
        assert_eq!(CacheKey::derive(&implicit), CacheKey::derive(&explicit));
    }

    #[test]
    fn test_each_field_changes_the_key() {
        let base = CacheKey::derive(&params(RawListQuery::default()));
        let variants = [
            RawListQuery::default().with_filter("a"),
            RawListQuery::default().with_sort_column("Year"),
            RawListQuery::default().with_sort_order("DESC"),
            RawListQuery::default().with_page_index("1"),
            RawListQuery::default().with_page_size("11"),
        ];
        for raw in variants {
            assert_ne!(CacheKey::derive(&params(raw.clone())), base, "{:?}", raw);
        }
    }

    #[test]
    fn test_delimiters_in_filter_do_not_collide() {
        // Without the length prefix both would render as "...|c:Name|..."
        let sneaky = params(RawListQuery::default().with_filter("x|c:Year"));
        let plain = params(RawListQuery::default().with_filter("x"));
        assert_ne!(CacheKey::derive(&sneaky), CacheKey::derive(&plain));

        let absent = params(RawListQuery::default());
        let literal = params(RawListQuery::default().with_filter("-"));
        assert_ne!(CacheKey::derive(&absent), CacheKey::derive(&literal));
    }
}
