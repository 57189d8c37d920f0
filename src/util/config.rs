use std::path::PathBuf;
use serde::Deserialize;
use crate::backend::column_type::Dialect;
use crate::util::error;

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
/// Connection settings handed to this layer by whoever owns the settings file.
pub struct DatabaseConfig {
    /// Database file. An in-memory database is opened when absent.
    pub path: Option<PathBuf>,
    /// Dialect the schema DDL is generated for.
    pub dialect: Dialect,
    pub foreign_keys: bool,
    pub journal_mode: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        return Self {
            path: None,
            dialect: Dialect::Sqlite,
            foreign_keys: true,
            journal_mode: String::from("WAL"),
        };
    }
}

impl DatabaseConfig {
    /// Config for a database file at the given path, everything else defaulted.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        return Self {
            path: Some(path.into()),
            ..Self::default()
        };
    }

    /// Parses a JSON settings document. Missing keys fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, error::Error> {
        return Ok(serde_json::from_str(json)?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DatabaseConfig::from_json("{}").unwrap();
        assert_eq!(config, DatabaseConfig::default());
        assert!(config.path.is_none());
        assert!(config.foreign_keys);
    }

    #[test]
    fn parses_every_key() {
        let config = DatabaseConfig::from_json(r#"{
            "path": "/tmp/finance.db",
            "dialect": "postgres",
            "foreignKeys": false,
            "journalMode": "DELETE"
        }"#).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/tmp/finance.db")));
        assert_eq!(config.dialect, Dialect::Postgres);
        assert!(!config.foreign_keys);
        assert_eq!(config.journal_mode, "DELETE");
    }

    #[test]
    fn rejects_unknown_dialect() {
        assert!(DatabaseConfig::from_json(r#"{"dialect": "oracle"}"#).is_err());
    }
}
