use std::str::FromStr;
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
/// Logical type of a column, used for default-value coercion, SQL literal formatting and display.
pub enum ColumnType {
    String,
    Int,
    Date,
    Currency,
    Float,
}

impl ColumnType {
    /// Name of the type as exposed to the presentation layer.
    pub fn as_str(&self) -> &'static str {
        return match self {
            Self::String => "STRING",
            Self::Int => "INT",
            Self::Date => "DATE",
            Self::Currency => "CURRENCY",
            Self::Float => "FLOAT",
        };
    }

    /// Whether literals of this type are emitted between single quotes.
    pub fn is_quoted(&self) -> bool {
        return match self {
            Self::String | Self::Currency | Self::Date => true,
            Self::Int | Self::Float => false,
        };
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// SQL dialect that DDL is generated for. DML is the same in every dialect.
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Expression producing a fresh UUID server-side.
    pub fn generated_uuid(&self) -> &'static str {
        return match self {
            // Needs the pgcrypto extension
            Self::Postgres => "gen_random_uuid()",
            Self::Sqlite => "(lower(hex(randomblob(16))))",
        };
    }

    /// Column clause marking an auto-incrementing key.
    pub fn auto_increment(&self) -> &'static str {
        return match self {
            Self::Postgres => "GENERATED BY DEFAULT AS IDENTITY",
            Self::Sqlite => "AUTOINCREMENT",
        };
    }

    /// Whether constraints are added after the fact with guarded ALTER TABLE blocks.
    /// When false they are declared inline in CREATE TABLE instead.
    pub fn has_guarded_constraints(&self) -> bool {
        return match self {
            Self::Postgres => true,
            Self::Sqlite => false,
        };
    }

    /// Statements that must run once before any table is created.
    pub fn schema_prologue(&self) -> &'static str {
        return match self {
            Self::Postgres => "CREATE EXTENSION IF NOT EXISTS pgcrypto;",
            Self::Sqlite => "",
        };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How enumerated columns are surfaced in a column list.
pub enum LabelMode {
    /// Just the column name.
    Raw,
    /// The column name suffixed with `_label`.
    Suffixed,
    /// A CASE expression mapping the stored value to its label, aliased to `<column>_label`.
    Expression,
}

impl LabelMode {
    pub fn from_use_labels(use_labels: bool) -> Self {
        return if use_labels { Self::Suffixed } else { Self::Raw };
    }
}

/// Suffix appended to enumerated columns when their label is displayed.
pub const LABEL_SUFFIX: &str = "_label";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        return match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        };
    }

    pub fn toggled(&self) -> Self {
        return match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        };
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.trim() {
            "Ascending" | "ASC" | "0" => Ok(Self::Ascending),
            "Descending" | "DESC" | "1" => Ok(Self::Descending),
            _ => Err(())
        };
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            Self::Ascending => write!(f, "Ascending"),
            Self::Descending => write!(f, "Descending"),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_round_trips_through_text() {
        assert_eq!(SortOrder::Descending.to_string().parse::<SortOrder>(), Ok(SortOrder::Descending));
        assert_eq!("0".parse::<SortOrder>(), Ok(SortOrder::Ascending));
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::Ascending.toggled(), SortOrder::Descending);
    }

    #[test]
    fn dialects_differ_only_in_ddl_fragments() {
        assert_eq!(Dialect::Postgres.generated_uuid(), "gen_random_uuid()");
        assert!(Dialect::Postgres.has_guarded_constraints());
        assert!(!Dialect::Sqlite.has_guarded_constraints());
        assert_eq!(Dialect::Sqlite.schema_prologue(), "");
    }
}
