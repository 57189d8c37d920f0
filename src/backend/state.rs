use rusqlite::Connection;
use crate::backend::column_type::SortOrder;
use crate::backend::data::TableAccess;
use crate::backend::filter::FilterCondition;
use crate::backend::table::TableSchema;
use crate::backend::value::{Record, Value};
use crate::util::notify;

const OBJECT: &str = "object";
const PROPERTY_NAME: &str = "property_name";
const PROPERTY_VALUE: &str = "property_value";

/// Durable properties of one named object, stored as rows of the key/value table.
///
/// All traffic goes through a [`TableAccess`] wired to a quiet notifier, so saving and
/// restoring never surfaces anything to the user.
pub struct State<'a> {
    access: TableAccess<'a>,
    object: String,
}

impl<'a> State<'a> {
    pub fn new(conn: &'a Connection, schema: &'a TableSchema, object: impl Into<String>) -> Self {
        return Self {
            access: TableAccess::new(conn, schema, notify::quiet()),
            object: object.into(),
        };
    }

    pub fn object(&self) -> &str {
        return &self.object;
    }

    pub fn error(&self) -> &str {
        return self.access.error();
    }

    /// The stored value of the property, or `default` if it is missing or cannot be read.
    pub fn restore(&mut self, property_name: &str, default: &str) -> String {
        let filters = [
            FilterCondition::equals(OBJECT, self.object.as_str()),
            FilterCondition::equals(PROPERTY_NAME, property_name),
        ];
        let rows = match self.access.select(&filters, None, SortOrder::Ascending, false) {
            Some(rows) => rows,
            None => { return default.to_string(); }
        };
        return match rows.first().and_then(|row| row.get(PROPERTY_VALUE)) {
            Some(value) if !value.is_null() => value.to_string(),
            _ => default.to_string()
        };
    }

    pub fn restore_sort_order(&mut self, property_name: &str, default: SortOrder) -> SortOrder {
        return self.restore(property_name, &default.to_string()).parse().unwrap_or(default);
    }

    /// A list stored as a JSON array of strings.
    pub fn restore_string_list(&mut self, property_name: &str, default: &[String]) -> Vec<String> {
        let stored = self.restore(property_name, "");
        if stored.is_empty() {
            return default.to_vec();
        }
        return match serde_json::from_str::<Vec<String>>(&stored) {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!("{} {}: unreadable list, using default: {e}", self.object, property_name);
                default.to_vec()
            }
        };
    }

    /// Stores the property, replacing any earlier value.
    pub fn save(&mut self, property_name: &str, value: &str) -> bool {
        let mut data = Record::new();
        data.insert(OBJECT.to_string(), Value::from(self.object.as_str()));
        data.insert(PROPERTY_NAME.to_string(), Value::from(property_name));
        data.insert(PROPERTY_VALUE.to_string(), Value::from(value));
        return self.access.upsert(&data, &[OBJECT, PROPERTY_NAME]).is_some();
    }

    pub fn save_sort_order(&mut self, property_name: &str, order: SortOrder) -> bool {
        return self.save(property_name, &order.to_string());
    }

    pub fn save_string_list(&mut self, property_name: &str, values: &[String]) -> bool {
        return match serde_json::to_string(values) {
            Ok(json) => self.save(property_name, &json),
            Err(e) => {
                tracing::debug!("{} {}: list not saved: {e}", self.object, property_name);
                false
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::column_type::Dialect;
    use crate::backend::db;
    use crate::backend::registry::TableRegistry;
    use crate::backend::tables;

    fn setup() -> (Connection, TableRegistry) {
        let conn = db::open_in_memory().unwrap();
        let registry = TableRegistry::new(Dialect::Sqlite);
        db::initialize_schema(&conn, &registry).unwrap();
        return (conn, registry);
    }

    fn state_rows(conn: &Connection) -> i64 {
        return conn.query_row("SELECT COUNT(*) FROM States", [], |row| row.get(0)).unwrap();
    }

    #[test]
    fn save_then_restore() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "VendorsTableModel");
        assert_eq!(state.restore("sortColumn", "id"), "id");
        assert!(state.save("sortColumn", "name"));
        assert_eq!(state.restore("sortColumn", "id"), "name");
    }

    #[test]
    fn saving_twice_keeps_one_row() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "X");
        assert!(state.save("p", "v1"));
        assert!(state.save("p", "v2"));
        assert_eq!(state_rows(&conn), 1);
        assert_eq!(state.restore("p", ""), "v2");
    }

    #[test]
    fn objects_do_not_share_properties() {
        let (conn, registry) = setup();
        let schema = registry.fetch(tables::STATES).unwrap();
        let mut a = State::new(&conn, schema, "A");
        let mut b = State::new(&conn, schema, "B");
        a.save("p", "from a");
        assert_eq!(b.restore("p", "unset"), "unset");
        assert_eq!(a.restore("p", "unset"), "from a");
    }

    #[test]
    fn typed_helpers() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "CategoriesTableModel");

        assert_eq!(state.restore_sort_order("sortOrder", SortOrder::Ascending), SortOrder::Ascending);
        state.save_sort_order("sortOrder", SortOrder::Descending);
        assert_eq!(state.restore_sort_order("sortOrder", SortOrder::Ascending), SortOrder::Descending);

        let columns = vec!["name".to_string(), "type_label".to_string()];
        state.save_string_list("visibleColumns", &columns);
        assert_eq!(state.restore_string_list("visibleColumns", &[]), columns);

        state.save("visibleColumns", "not json");
        assert_eq!(state.restore_string_list("visibleColumns", &["name".to_string()]), vec!["name".to_string()]);
    }

    #[test]
    fn restore_falls_back_when_table_is_missing() {
        let conn = db::open_in_memory().unwrap();
        let schema = tables::states(Dialect::Sqlite);
        let mut state = State::new(&conn, &schema, "X");
        assert_eq!(state.restore("p", "fallback"), "fallback");
        assert!(!state.save("p", "v"));
        assert!(state.error().starts_with("States save failed"));
    }
}
