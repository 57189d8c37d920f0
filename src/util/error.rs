use rusqlite::Error as RusqliteError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    AdhocError(String),
    #[error("An SQLite error occurred while initializing the database schema: {0}")]
    SchemaInitializationError(RusqliteError),
    #[error("SQLite error occurred: {0}")]
    RusqliteError(#[from] RusqliteError),
    #[error("JSON error occurred: {0}")]
    SerdeJsonError(#[from] SerdeJsonError),
    #[error("No table named {0} is registered.")]
    UnknownTable(String),
    #[error("Table {0} has no primary key.")]
    MissingPrimaryKey(String),
    #[error("id not found: {0}")]
    NotFound(String),
    #[error("no columns to update")]
    NothingToUpdate,
}

impl From<Error> for String {
    fn from(e: Error) -> String {
        return e.to_string();
    }
}
