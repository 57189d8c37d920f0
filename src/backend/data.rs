use std::rc::Rc;
use rusqlite::Connection;
use uuid::Uuid;
use crate::backend::column::ColumnDefinition;
use crate::backend::column_type::{ColumnType, SortOrder};
use crate::backend::db;
use crate::backend::filter::FilterCondition;
use crate::backend::table::TableSchema;
use crate::backend::value::{Record, Value};
use crate::util::error;
use crate::util::notify::{Notifier, Reporter};

/// Generic CRUD over one table, driven entirely by its schema.
///
/// Every public operation reports its outcome through the [`Reporter`]: failures are recorded
/// as the last error and never propagated.
pub struct TableAccess<'a> {
    conn: &'a Connection,
    schema: &'a TableSchema,
    reporter: Reporter,
}

impl<'a> TableAccess<'a> {
    pub fn new(conn: &'a Connection, schema: &'a TableSchema, notifier: Rc<dyn Notifier>) -> Self {
        return Self {
            conn,
            schema,
            reporter: Reporter::new(schema.table_name(), notifier),
        };
    }

    pub fn schema(&self) -> &'a TableSchema {
        return self.schema;
    }

    /// Text of the last error, empty if the last operation succeeded.
    pub fn error(&self) -> &str {
        return self.reporter.error();
    }

    pub(crate) fn reporter(&mut self) -> &mut Reporter {
        return &mut self.reporter;
    }

    /// Number of rows in the table, or None on failure.
    pub fn count(&mut self) -> Option<i64> {
        match self.conn.query_row(&self.schema.count_sql(), [], |row| row.get::<_, i64>(0)) {
            Ok(count) => {
                self.reporter.success("count:", count.to_string());
                return Some(count);
            },
            Err(e) => {
                self.reporter.fail(format!("count(*) failed: {e}"));
                return None;
            }
        }
    }

    /// Inserts a row with a freshly generated primary key, returning that key.
    pub fn add(&mut self, data: &Record) -> Option<String> {
        match self.try_add(data) {
            Ok(id) => {
                self.reporter.success("added ID:", &id);
                return Some(id);
            },
            Err(e) => {
                self.reporter.fail(format!("add failed: {e}"));
                return None;
            }
        }
    }

    /// The row with the given primary key, or an empty record on failure.
    /// An empty id yields the defaults of a new record without querying.
    pub fn get(&mut self, id: &str) -> Record {
        if id.is_empty() {
            return self.schema.initialize_defaults();
        }
        match self.try_get(id) {
            Ok(record) => {
                self.reporter.success("get ID:", id);
                return record;
            },
            Err(e) => {
                self.reporter.fail(format!("get failed: {e}"));
                return Record::new();
            }
        }
    }

    /// Updates the supplied non-key columns of the row with the given primary key.
    pub fn update(&mut self, id: &str, data: &Record) -> bool {
        return match self.try_update(id, data) {
            Ok(()) => self.reporter.success("updated ID:", id),
            Err(e) => self.reporter.fail(format!("update failed: {e}"))
        };
    }

    pub fn remove(&mut self, id: &str) -> bool {
        return match self.try_remove(id) {
            Ok(()) => self.reporter.success("deleted ID:", id),
            Err(e) => self.reporter.fail(format!("delete failed: {e}"))
        };
    }

    /// Rows matching the filters, or None on failure.
    pub fn select(&mut self, filters: &[FilterCondition], sort_column: Option<&str>, sort_order: SortOrder, use_labels: bool) -> Option<Vec<Record>> {
        match self.try_select(filters, sort_column, sort_order, use_labels) {
            Ok(records) => {
                self.reporter.success("selected rows:", records.len().to_string());
                return Some(records);
            },
            Err(e) => {
                self.reporter.fail(format!("select failed: {e}"));
                return None;
            }
        }
    }

    /// Inserts the row, or updates the row matching on `match_columns`.
    /// Returns the key of the stored row: a fresh key on insert, the existing key on update.
    pub fn upsert(&mut self, data: &Record, match_columns: &[&str]) -> Option<String> {
        match self.try_upsert(data, match_columns) {
            Ok(id) => {
                self.reporter.success("saved ID:", &id);
                return Some(id);
            },
            Err(e) => {
                self.reporter.fail(format!("save failed: {e}"));
                return None;
            }
        }
    }

    fn primary_key_column(&self) -> Result<&'a ColumnDefinition, error::Error> {
        return self.schema.primary_key_column()
            .ok_or_else(|| error::Error::MissingPrimaryKey(self.schema.table_name().to_string()));
    }

    /// Primary key text as the value bound to the key placeholder.
    fn key_value(&self, column: &ColumnDefinition, id: &str) -> Value {
        return Value::from(id).coerce(&column.column_type);
    }

    /// A new primary key: a UUID for text keys, one past the largest key for integer keys.
    fn next_key(&self, column: &ColumnDefinition) -> Result<Value, error::Error> {
        match column.column_type {
            ColumnType::Int => {
                let sql = format!("SELECT COALESCE(MAX({}), 0) + 1 FROM {}", column.name, self.schema.table_name());
                let next: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
                return Ok(Value::Int(next));
            },
            _ => {
                return Ok(Value::Text(Uuid::new_v4().to_string()));
            }
        }
    }

    /// Bindings for the given columns: the key bound to `key`, every other column from `data`.
    fn bindings(&self, columns: &[&ColumnDefinition], key: &Value, data: &Record) -> db::Bindings {
        return columns.iter()
            .map(|column| {
                let value = if column.is_primary_key {
                    key.clone()
                } else {
                    data.get(&column.name).cloned().unwrap_or(Value::Null).coerce(&column.column_type)
                };
                (column.placeholder(), value)
            })
            .collect();
    }

    fn try_add(&self, data: &Record) -> Result<String, error::Error> {
        let pk = self.primary_key_column()?;
        let key = self.next_key(pk)?;
        let bindings = self.bindings(&self.schema.insert_columns(data), &key, data);
        db::execute_named(self.conn, &self.schema.insert_sql(data), &bindings)?;
        return Ok(key.to_string());
    }

    fn try_get(&self, id: &str) -> Result<Record, error::Error> {
        let pk = self.primary_key_column()?;
        let bindings: db::Bindings = vec![(pk.placeholder(), self.key_value(pk, id))];
        let records = db::query_records(self.conn, self.schema, &self.schema.select_sql(false), &bindings)?;
        return records.into_iter().next().ok_or_else(|| error::Error::NotFound(id.to_string()));
    }

    fn try_update(&self, id: &str, data: &Record) -> Result<(), error::Error> {
        let pk = self.primary_key_column()?;
        let mut columns = self.schema.update_columns(data);
        if columns.is_empty() {
            return Err(error::Error::NothingToUpdate);
        }
        columns.push(pk);

        let bindings = self.bindings(&columns, &self.key_value(pk, id), data);
        let changed = db::execute_named(self.conn, &self.schema.update_sql(data), &bindings)?;
        if changed == 0 {
            return Err(error::Error::NotFound(id.to_string()));
        }
        return Ok(());
    }

    fn try_remove(&self, id: &str) -> Result<(), error::Error> {
        let pk = self.primary_key_column()?;
        let bindings: db::Bindings = vec![(pk.placeholder(), self.key_value(pk, id))];
        let changed = db::execute_named(self.conn, &self.schema.delete_sql(), &bindings)?;
        if changed == 0 {
            return Err(error::Error::NotFound(id.to_string()));
        }
        return Ok(());
    }

    pub(crate) fn try_select(&self, filters: &[FilterCondition], sort_column: Option<&str>, sort_order: SortOrder, use_labels: bool) -> Result<Vec<Record>, error::Error> {
        let sql = self.schema.select_sorted_sql(filters, sort_column, sort_order, use_labels);
        return db::query_records(self.conn, self.schema, &sql, &Vec::new());
    }

    fn try_upsert(&self, data: &Record, match_columns: &[&str]) -> Result<String, error::Error> {
        let pk = self.primary_key_column()?;
        let key = self.next_key(pk)?;
        let bindings = self.bindings(&self.schema.insert_columns(data), &key, data);
        db::execute_named(self.conn, &self.schema.update_insert_sql(data, match_columns), &bindings)?;

        // An update keeps the stored key, so read it back through the match columns
        let filters: Vec<FilterCondition> = match_columns.iter()
            .filter_map(|name| self.schema.column(name))
            .map(|column| {
                let value = if column.is_primary_key {
                    key.clone()
                } else {
                    data.get(&column.name).cloned().unwrap_or(Value::Null).coerce(&column.column_type)
                };
                FilterCondition::equals(column.name.as_str(), value)
            })
            .collect();
        if filters.is_empty() {
            return Ok(key.to_string());
        }
        let records = self.try_select(&filters, None, SortOrder::Ascending, false)?;
        return records.into_iter()
            .find_map(|record| record.get(&pk.name).map(|id| id.to_string()))
            .ok_or_else(|| error::Error::NotFound(key.to_string()));
    }
}
