use rusqlite::{Connection, Params, Row, ToSql};
use crate::backend::registry::TableRegistry;
use crate::backend::table::TableSchema;
use crate::backend::value::{Record, Value};
use crate::util::config::DatabaseConfig;
use crate::util::error;

/// Named placeholder bindings, e.g. `(":name", Value::Text("Acme"))`.
pub type Bindings = Vec<(String, Value)>;

/// Opens a connection as described by the configuration.
pub fn open(config: &DatabaseConfig) -> Result<Connection, error::Error> {
    let conn = match &config.path {
        Some(path) => Connection::open(path)?,
        None => Connection::open_in_memory()?
    };

    // Step 1: foreign keys are off by default in SQLite
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;

    // Step 2: journal mode only applies to files
    if config.path.is_some() {
        let requested = config.journal_mode.trim().to_uppercase();
        if !JOURNAL_MODES.contains(&requested.as_str()) {
            return Err(error::Error::AdhocError(format!("unknown journal mode: {}", config.journal_mode)));
        }
        // The pragma answers with the mode now in effect
        let mode: String = conn.query_row(&format!("PRAGMA journal_mode = {requested}"), [], |row| row.get(0))?;
        tracing::debug!("journal mode: {mode}");
    }
    return Ok(conn);
}

const JOURNAL_MODES: [&str; 6] = ["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Opens an in-memory database with foreign keys enforced.
pub fn open_in_memory() -> Result<Connection, error::Error> {
    return open(&DatabaseConfig::default());
}

/// The full schema creation script: prologue, every table, then every guarded constraint block.
/// Every statement is idempotent, so the script can run on each start.
pub fn schema_script(registry: &TableRegistry) -> String {
    let mut statements: Vec<String> = Vec::new();

    let prologue = registry.dialect().schema_prologue();
    if !prologue.is_empty() {
        statements.push(prologue.to_string());
    }
    for schema in registry.tables() {
        statements.push(schema.create_table_sql());
    }
    for schema in registry.tables() {
        for block in [schema.create_unique_constraint_sql(), schema.create_column_constraint_sql(), schema.create_foreign_key_sql()] {
            if !block.is_empty() {
                statements.push(block);
            }
        }
    }
    return statements.join("\n");
}

/// Creates every registered table and constraint that does not exist yet.
pub fn initialize_schema(conn: &Connection, registry: &TableRegistry) -> Result<(), error::Error> {
    conn.execute_batch(&schema_script(registry)).map_err(error::Error::SchemaInitializationError)?;
    tracing::info!("schema initialized: {} tables", registry.len());
    return Ok(());
}

/// Executes a statement with named bindings, returning the number of rows changed.
pub fn execute_named(conn: &Connection, sql: &str, bindings: &Bindings) -> Result<usize, error::Error> {
    let params: Vec<(&str, &dyn ToSql)> = bindings.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect();
    return Ok(conn.execute(sql, params.as_slice())?);
}

/// Convenience method to execute a query that returns multiple rows, then execute a function for each row.
pub fn query_iterate<P: Params, F: FnMut(&Row<'_>) -> Result<(), error::Error>>(conn: &Connection, sql: &str, p: P, f: &mut F) -> Result<(), error::Error> {
    // Prepare a statement
    let mut stmt = conn.prepare(sql)?;

    // Execute the statement to query rows
    let mut rows = stmt.query(p)?;
    loop {
        let row = match rows.next()? {
            Some(r) => r,
            None => { break; }
        };
        f(row)?;
    }
    return Ok(());
}

/// Runs a query with named bindings and reads every row into a record keyed by result column name.
/// Values of schema columns are coerced to the column's logical type.
pub fn query_records(conn: &Connection, schema: &TableSchema, sql: &str, bindings: &Bindings) -> Result<Vec<Record>, error::Error> {
    // Column names come from the statement that runs the query
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let params: Vec<(&str, &dyn ToSql)> = bindings.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect();

    let mut records: Vec<Record> = Vec::new();
    let mut rows = stmt.query(params.as_slice())?;
    loop {
        let row = match rows.next()? {
            Some(r) => r,
            None => { break; }
        };
        let mut record = Record::new();
        for (i, name) in column_names.iter().enumerate() {
            let value: Value = row.get(i)?;
            let value = match schema.column(name) {
                Some(column) => value.coerce(&column.column_type),
                None => value
            };
            record.insert(name.clone(), value);
        }
        records.push(record);
    }
    return Ok(records);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::column_type::Dialect;

    #[test]
    fn postgres_script_starts_with_extension() {
        let script = schema_script(&TableRegistry::new(Dialect::Postgres));
        assert!(script.starts_with("CREATE EXTENSION IF NOT EXISTS pgcrypto;\nCREATE TABLE IF NOT EXISTS Categories ("));
        assert!(script.contains("lower(conname) = lower('chk_Categories_type')"));
        assert!(script.contains("conname = 'fk_vendors_category_id'"));
        assert!(script.contains("conname = 'uq_states_object_property_name'"));
    }

    #[test]
    fn sqlite_script_is_plain_tables() {
        let script = schema_script(&TableRegistry::new(Dialect::Sqlite));
        assert_eq!(script.lines().count(), 3);
        assert!(!script.contains("DO $$"));
    }

    #[test]
    fn initialize_twice_is_harmless() {
        let conn = open_in_memory().unwrap();
        let registry = TableRegistry::new(Dialect::Sqlite);
        initialize_schema(&conn, &registry).unwrap();
        initialize_schema(&conn, &registry).unwrap();

        let mut tables: Vec<String> = Vec::new();
        query_iterate(&conn, "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name", [], &mut |row| {
            tables.push(row.get(0)?);
            return Ok(());
        }).unwrap();
        assert_eq!(tables, vec!["Categories", "States", "Vendors"]);
    }

    #[test]
    fn file_database_uses_configured_journal_mode() {
        let path = std::env::temp_dir().join(format!("finance-db-{}.db", uuid::Uuid::new_v4()));
        let conn = open(&DatabaseConfig::at_path(path.clone())).unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode, "wal");
        drop(conn);

        let mut config = DatabaseConfig::at_path(path.clone());
        config.journal_mode = String::from("sideways");
        assert!(open(&config).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn postgres_script_fails_on_sqlite() {
        let conn = open_in_memory().unwrap();
        let result = initialize_schema(&conn, &TableRegistry::new(Dialect::Postgres));
        assert!(matches!(result, Err(error::Error::SchemaInitializationError(_))));
    }

    #[test]
    fn query_records_reads_named_bindings_and_coerces() {
        let conn = open_in_memory().unwrap();
        let registry = TableRegistry::new(Dialect::Sqlite);
        initialize_schema(&conn, &registry).unwrap();
        conn.execute_batch("INSERT INTO Vendors (id, name, unpaid_balance) VALUES ('v1', 'Acme', 0), ('v2', 'Bolt', 3);").unwrap();

        let schema = registry.fetch("Vendors").unwrap();
        let bindings: Bindings = vec![(":name".to_string(), Value::from("Acme"))];
        let records = query_records(&conn, schema, "SELECT id, unpaid_balance, 1 AS extra FROM Vendors WHERE name = :name", &bindings).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id"), Some(&Value::from("v1")));
        assert_eq!(records[0].get("unpaid_balance"), Some(&Value::Float(0.0)));
        assert_eq!(records[0].get("extra"), Some(&Value::Int(1)));

        let none = query_records(&conn, schema, "SELECT id FROM Vendors WHERE name = :name", &vec![(":name".to_string(), Value::from("Nobody"))]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = open_in_memory().unwrap();
        initialize_schema(&conn, &TableRegistry::new(Dialect::Sqlite)).unwrap();
        let bindings: Bindings = vec![
            (":id".to_string(), Value::from("v1")),
            (":category_id".to_string(), Value::from("missing")),
            (":name".to_string(), Value::from("Acme")),
        ];
        let result = execute_named(&conn, "INSERT INTO Vendors (id, category_id, name) VALUES (:id, :category_id, :name)", &bindings);
        assert!(result.is_err());
    }
}
