pub mod column;
pub mod column_type;
pub mod data;
pub mod db;
pub mod filter;
pub mod registry;
pub mod state;
pub mod table;
pub mod table_data;
pub mod tables;
pub mod value;

use std::rc::Rc;
use rusqlite::Connection;
use crate::util::config::DatabaseConfig;
use crate::util::error;
use crate::util::notify::Notifier;
use data::TableAccess;
use registry::TableRegistry;
use state::State;
use table_data::TableModel;

/// The surface handed to the presentation layer: one shared connection plus every table schema.
pub struct Backend {
    conn: Connection,
    registry: TableRegistry,
}

impl Backend {
    /// Opens the configured database and creates any missing tables and constraints.
    /// Failure here is fatal to startup.
    pub fn open(config: &DatabaseConfig) -> Result<Self, error::Error> {
        let conn = db::open(config)?;
        let registry = TableRegistry::new(config.dialect);
        db::initialize_schema(&conn, &registry)?;
        tracing::info!("database opened: {}", config.path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| String::from(":memory:")));
        return Ok(Self { conn, registry });
    }

    /// Wraps a connection opened elsewhere. The schema is assumed to be initialized.
    pub fn from_connection(conn: Connection, registry: TableRegistry) -> Self {
        return Self { conn, registry };
    }

    pub fn connection(&self) -> &Connection {
        return &self.conn;
    }

    pub fn registry(&self) -> &TableRegistry {
        return &self.registry;
    }

    /// CRUD access to a registered table.
    pub fn access(&self, table_name: &str, notifier: Rc<dyn Notifier>) -> Result<TableAccess<'_>, error::Error> {
        let schema = self.registry.fetch(table_name).ok_or_else(|| error::Error::UnknownTable(table_name.to_string()))?;
        return Ok(TableAccess::new(&self.conn, schema, notifier));
    }

    /// A sorted display model of a registered table.
    pub fn model(&self, table_name: &str, notifier: Rc<dyn Notifier>) -> Result<TableModel<'_>, error::Error> {
        return TableModel::new(&self.conn, &self.registry, table_name, notifier);
    }

    /// Persisted properties of the named object.
    pub fn state(&self, object: &str) -> Result<State<'_>, error::Error> {
        let schema = self.registry.fetch(tables::STATES).ok_or_else(|| error::Error::UnknownTable(tables::STATES.to_string()))?;
        return Ok(State::new(&self.conn, schema, object));
    }
}
