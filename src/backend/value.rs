use std::collections::HashMap;
use std::fmt;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Error as RusqliteError, ToSql};
use serde::{Serialize, Deserialize};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use crate::backend::column_type::ColumnType;

/// A row as handed to and from the presentation layer: column name to value.
pub type Record = HashMap<String, Value>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    #[serde(with = "iso_date")]
    Date(Date),
    Text(String),
    List(Vec<Value>),
}

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses a `yyyy-MM-dd` date.
pub fn parse_date(s: &str) -> Option<Date> {
    return Date::parse(s.trim(), ISO_DATE).ok();
}

/// Formats a date as `yyyy-MM-dd`.
pub fn format_date(date: &Date) -> String {
    // Every component of the description is present on a Date
    return date.format(ISO_DATE).unwrap_or_else(|_| date.to_string());
}

impl Value {
    pub fn is_null(&self) -> bool {
        return matches!(self, Self::Null);
    }

    pub fn as_i64(&self) -> Option<i64> {
        return match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None
        };
    }

    pub fn as_f64(&self) -> Option<f64> {
        return match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None
        };
    }

    pub fn as_date(&self) -> Option<Date> {
        return match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => parse_date(s),
            _ => None
        };
    }

    /// Converts the value to the representation used for the given logical type.
    /// Values that cannot be converted are returned unchanged.
    pub fn coerce(self, column_type: &ColumnType) -> Value {
        if self.is_null() {
            return self;
        }
        return match column_type {
            ColumnType::String => match self {
                Self::Text(_) | Self::List(_) => self,
                other => Self::Text(other.to_string())
            },
            ColumnType::Int => match self.as_i64() {
                Some(i) => Self::Int(i),
                None => self
            },
            ColumnType::Currency | ColumnType::Float => match self.as_f64() {
                Some(f) => Self::Float(f),
                None => self
            },
            ColumnType::Date => match self.as_date() {
                Some(d) => Self::Date(d),
                None => self
            }
        };
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Date(d) => write!(f, "{}", format_date(d)),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        };
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        return Self::Text(s.to_string());
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        return Self::Text(s);
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        return Self::Int(i);
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        return Self::Float(x);
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        return Self::Date(d);
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        return Self::List(items.into_iter().map(Into::into).collect());
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        return match self {
            Self::Null => Ok(ToSqlOutput::from(rusqlite::types::Null)),
            Self::Int(i) => Ok(ToSqlOutput::from(*i)),
            Self::Float(x) => Ok(ToSqlOutput::from(*x)),
            Self::Date(d) => Ok(ToSqlOutput::from(format_date(d))),
            Self::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            Self::List(_) => {
                // Lists have no SQL column type; store them as a JSON array
                let json = serde_json::to_string(self).map_err(|e| RusqliteError::ToSqlConversionFailure(Box::new(e)))?;
                Ok(ToSqlOutput::from(json))
            }
        };
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        return match value {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(i) => Ok(Self::Int(i)),
            ValueRef::Real(x) => Ok(Self::Float(x)),
            ValueRef::Text(bytes) => Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType)
        };
    }
}

mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.serialize_str(&super::format_date(date));
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        return super::parse_date(&s).ok_or_else(|| D::Error::custom(format!("not a yyyy-MM-dd date: {s}")));
    }
}
