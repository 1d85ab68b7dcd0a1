//! Sort column and sort order validators
//!
//! Both are pure predicates. Column validation is backed by an allow-list
//! supplied at construction, so the same validator type serves any
//! [`SortColumn`] enum.

use crate::error::{Error, Result};
use crate::record::{SortColumn, SortOrder};

/// Allow-list of sortable columns for one record type
#[derive(Debug, Clone)]
pub struct ColumnValidator<C> {
    allowed: Vec<C>,
}

impl<C: SortColumn> ColumnValidator<C> {
    /// Build a validator from configured column names
    ///
    /// Every name must be the wire name of a `C` variant; an unknown name is a
    /// configuration error, not something to silently drop.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = Vec::new();
        for name in names {
            let name = name.as_ref();
            let column = C::from_name(name).ok_or_else(|| {
                Error::InvalidConfig(format!("unknown sortable column '{}'", name))
            })?;
            if !allowed.contains(&column) {
                allowed.push(column);
            }
        }

        if allowed.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one sortable column is required".to_string(),
            ));
        }

        Ok(Self { allowed })
    }

    /// Allow every column of `C`
    pub fn all() -> Self {
        Self {
            allowed: C::ALL.to_vec(),
        }
    }

    /// `true` when `name` is a non-empty, allow-listed column name
    pub fn validate_sort_column(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Map an allow-listed column name to its typed variant
    pub fn resolve(&self, name: &str) -> Option<C> {
        if name.is_empty() {
            return None;
        }
        C::from_name(name).filter(|c| self.allowed.contains(c))
    }

    /// Allow-listed wire names, in configuration order
    pub fn allowed_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.allowed.iter().map(|c| c.name())
    }

    /// Field error message listing the accepted columns
    pub fn rejection_message(&self) -> String {
        one_of_message(self.allowed_names())
    }
}

/// `true` when `value` is exactly `ASC` or `DESC`
pub fn validate_sort_order(value: &str) -> bool {
    SortOrder::parse(value).is_some()
}

/// Field error message listing the accepted sort orders
pub fn sort_order_rejection_message() -> String {
    one_of_message(SortOrder::ALL.iter().map(|o| o.as_str()))
}

fn one_of_message<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let joined = values.collect::<Vec<_>>().join(",");
    format!("Value must be one of the following: {}.", joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BoardGameColumn;

    #[test]
    fn test_validate_sort_column() {
        let validator = ColumnValidator::<BoardGameColumn>::from_names(["Name", "Year"]).unwrap();

        assert!(validator.validate_sort_column("Name"));
        assert!(validator.validate_sort_column("Year"));
        // known column, but not allow-listed
        assert!(!validator.validate_sort_column("Id"));
        assert!(!validator.validate_sort_column(""));
        assert!(!validator.validate_sort_column("name"));
        assert!(!validator.validate_sort_column("DROP TABLE"));
        assert!(!validator.validate_sort_column("Name; DROP TABLE BoardGames"));
    }

    #[test]
    fn test_resolve() {
        let validator = ColumnValidator::<BoardGameColumn>::all();
        assert_eq!(validator.resolve("Year"), Some(BoardGameColumn::Year));
        assert_eq!(
            validator.resolve("LastModifiedDate"),
            Some(BoardGameColumn::LastModifiedDate)
        );
        assert_eq!(validator.resolve("Publisher"), None);
    }

    #[test]
    fn test_from_names_rejects_unknown() {
        let result = ColumnValidator::<BoardGameColumn>::from_names(["Name", "Publisher"]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_names_rejects_empty() {
        let result = ColumnValidator::<BoardGameColumn>::from_names(Vec::<String>::new());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_names_deduplicates() {
        let validator =
            ColumnValidator::<BoardGameColumn>::from_names(["Year", "Name", "Year"]).unwrap();
        assert_eq!(validator.allowed_names().collect::<Vec<_>>(), ["Year", "Name"]);
    }

    #[test]
    fn test_validate_sort_order() {
        assert!(validate_sort_order("ASC"));
        assert!(validate_sort_order("DESC"));
        assert!(!validate_sort_order("desc"));
        assert!(!validate_sort_order("SIDEWAYS"));
        assert!(!validate_sort_order(""));
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            sort_order_rejection_message(),
            "Value must be one of the following: ASC,DESC."
        );
        let validator = ColumnValidator::<BoardGameColumn>::from_names(["Name", "Year"]).unwrap();
        assert_eq!(
            validator.rejection_message(),
            "Value must be one of the following: Name,Year."
        );
    }
}
