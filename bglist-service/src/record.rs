//! Listed entities and their sortable columns
//!
//! The listing pipeline is generic over a [`Record`] and its closed set of
//! [`SortColumn`]s. A column name coming from a request is resolved once, at
//! validation time, to a typed variant; nothing downstream ever builds an
//! ordering from a raw string.
//!
//! # Example
//!
//! ```rust
//! use bglist_service::record::{BoardGame, BoardGameColumn, Record, SortColumn};
//! use std::cmp::Ordering;
//!
//! let axis = BoardGame::new(1, "Axis & Allies", 1981);
//! let citadels = BoardGame::new(2, "Citadels", 2000);
//!
//! assert_eq!(BoardGameColumn::from_name("Year"), Some(BoardGameColumn::Year));
//! assert_eq!(BoardGameColumn::from_name("year"), None);
//! assert_eq!(axis.compare_by(&citadels, BoardGameColumn::Year), Ordering::Less);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sort direction for list queries
///
/// Wire tokens are exactly `ASC` and `DESC`; matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Sort in ascending order (A-Z, 0-9, oldest first)
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    /// Sort in descending order (Z-A, 9-0, newest first)
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// All accepted orders, in the order they are listed in error messages
    pub const ALL: [SortOrder; 2] = [SortOrder::Asc, SortOrder::Desc];

    /// Wire token, also usable as an SQL `ORDER BY` direction
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse a wire token; anything but `ASC` or `DESC` is rejected
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == value)
    }

    /// Apply this direction to an ascending comparison
    #[must_use]
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed set of fields a [`Record`] can be ordered by
pub trait SortColumn: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every variant
    const ALL: &'static [Self];

    /// Case-sensitive wire name
    fn name(&self) -> &'static str;

    /// Resolve a wire name to a variant
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// An entity served by the listing endpoint
pub trait Record: Clone + Serialize + Send + Sync + 'static {
    /// Columns this record can be sorted by
    type Column: SortColumn;

    /// Stable unique identifier, used to break sort ties
    fn id(&self) -> i64;

    /// Field matched by the free-text filter
    fn name(&self) -> &str;

    /// Ascending comparison on one column
    fn compare_by(&self, other: &Self, column: Self::Column) -> Ordering;
}

/// A board game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct BoardGame {
    pub id: i32,
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub last_modified_date: DateTime<Utc>,
}

impl BoardGame {
    /// Build a board game with an epoch modification date
    pub fn new(id: i32, name: impl Into<String>, year: i32) -> Self {
        Self {
            id,
            name: name.into(),
            year,
            last_modified_date: DateTime::<Utc>::default(),
        }
    }

    #[must_use]
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified_date = at;
        self
    }
}

/// Sortable [`BoardGame`] fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardGameColumn {
    Id,
    Name,
    Year,
    LastModifiedDate,
}

impl BoardGameColumn {
    /// Column identifier in the `board_games` table
    pub const fn sql_column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Year => "year",
            Self::LastModifiedDate => "last_modified_date",
        }
    }

    /// `ORDER BY` expression for this column
    ///
    /// Text is compared bytewise (`COLLATE "C"`) so the database orders
    /// names the same way as `String::cmp`.
    pub const fn order_expr(&self) -> &'static str {
        match self {
            Self::Name => r#"name COLLATE "C""#,
            other => other.sql_column(),
        }
    }
}

impl SortColumn for BoardGameColumn {
    const ALL: &'static [Self] = &[Self::Id, Self::Name, Self::Year, Self::LastModifiedDate];

    fn name(&self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Name => "Name",
            Self::Year => "Year",
            Self::LastModifiedDate => "LastModifiedDate",
        }
    }
}

impl Record for BoardGame {
    type Column = BoardGameColumn;

    fn id(&self) -> i64 {
        i64::from(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn compare_by(&self, other: &Self, column: BoardGameColumn) -> Ordering {
        match column {
            BoardGameColumn::Id => self.id.cmp(&other.id),
            BoardGameColumn::Name => self.name.cmp(&other.name),
            BoardGameColumn::Year => self.year.cmp(&other.year),
            BoardGameColumn::LastModifiedDate => {
                self.last_modified_date.cmp(&other.last_modified_date)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_tokens_are_case_sensitive() {
        assert_eq!(SortOrder::parse("ASC"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("asc"), None);
        assert_eq!(SortOrder::parse("SIDEWAYS"), None);
        assert_eq!(SortOrder::parse(""), None);
    }

    #[test]
    fn test_sort_order_apply() {
        assert_eq!(SortOrder::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortOrder::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortOrder::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn test_sort_order_serde() {
        assert_eq!(serde_json::to_string(&SortOrder::Desc).unwrap(), "\"DESC\"");
        let order: SortOrder = serde_json::from_str("\"ASC\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in BoardGameColumn::ALL {
            assert_eq!(BoardGameColumn::from_name(column.name()), Some(*column));
        }
        assert_eq!(BoardGameColumn::from_name("DROP TABLE"), None);
        assert_eq!(BoardGameColumn::from_name("name"), None);
    }

    #[test]
    fn test_name_orders_with_binary_collation() {
        assert_eq!(BoardGameColumn::Name.order_expr(), r#"name COLLATE "C""#);
        assert_eq!(BoardGameColumn::Year.order_expr(), "year");
        assert_eq!(BoardGameColumn::Id.order_expr(), "id");
    }

    #[test]
    fn test_board_game_serializes_camel_case() {
        let game = BoardGame::new(3, "Terraforming Mars", 2016);
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Terraforming Mars");
        assert_eq!(json["year"], 2016);
        assert!(json.get("lastModifiedDate").is_some());
    }

    #[test]
    fn test_board_game_deserializes_without_date() {
        let game: BoardGame =
            serde_json::from_str(r#"{"id":2,"name":"Citadels","year":2000}"#).unwrap();
        assert_eq!(game, BoardGame::new(2, "Citadels", 2000));
    }

    #[test]
    fn test_compare_by_last_modified() {
        let older = BoardGame::new(1, "A", 2000);
        let newer = BoardGame::new(2, "B", 2000)
            .with_last_modified(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap());
        assert_eq!(
            older.compare_by(&newer, BoardGameColumn::LastModifiedDate),
            Ordering::Less
        );
        assert_eq!(older.compare_by(&newer, BoardGameColumn::Year), Ordering::Equal);
    }
}
