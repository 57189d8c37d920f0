use crate::backend::column_type::ColumnType;
use crate::backend::value::{format_date, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Like,
    In,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub fn as_sql(&self) -> &'static str {
        return match self {
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        };
    }

    /// Whether the operator compares against a value.
    pub fn takes_value(&self) -> bool {
        return !matches!(self, Self::IsNull | Self::IsNotNull);
    }
}

#[derive(Clone, Debug, PartialEq)]
/// One `column operator value` predicate of a WHERE clause.
pub struct FilterCondition {
    pub column_name: String,
    pub operator: FilterOperator,
    /// Required unless the operator is IsNull/IsNotNull; a list for In.
    pub value: Option<Value>,
}

impl FilterCondition {
    pub fn new(column_name: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        return Self {
            column_name: column_name.into(),
            operator,
            value: Some(value.into()),
        };
    }

    pub fn is_null(column_name: impl Into<String>) -> Self {
        return Self { column_name: column_name.into(), operator: FilterOperator::IsNull, value: None };
    }

    pub fn is_not_null(column_name: impl Into<String>) -> Self {
        return Self { column_name: column_name.into(), operator: FilterOperator::IsNotNull, value: None };
    }

    pub fn equals(column_name: impl Into<String>, value: impl Into<Value>) -> Self {
        return Self::new(column_name, FilterOperator::Equals, value);
    }
}

/// Single-quotes text, doubling any embedded quote.
pub fn quote(text: &str) -> String {
    return format!("'{}'", text.replace('\'', "''"));
}

/// Formats a value as an SQL literal of the given logical type.
///
/// This is the only path through which values are embedded into SQL text rather than bound
/// to a placeholder. Numbers are emitted bare only when the value really is numeric; anything
/// else is quoted, so text can never escape into the statement.
pub fn format_value(value: &Value, column_type: &ColumnType) -> String {
    if value.is_null() {
        return String::from("NULL");
    }
    if column_type.is_quoted() {
        return match (column_type, value.as_date()) {
            (ColumnType::Date, Some(d)) => quote(&format_date(&d)),
            _ => quote(&value.to_string())
        };
    }
    let bare = match column_type {
        ColumnType::Int => value.as_i64().map(|i| i.to_string()),
        _ => value.as_f64().filter(|x| x.is_finite()).map(|x| x.to_string())
    };
    return bare.unwrap_or_else(|| quote(&value.to_string()));
}
