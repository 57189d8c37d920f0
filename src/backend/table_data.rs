use std::rc::Rc;
use rusqlite::Connection;
use crate::backend::column::ColumnDefinition;
use crate::backend::column_type::{ColumnType, LabelMode, SortOrder, LABEL_SUFFIX};
use crate::backend::data::TableAccess;
use crate::backend::registry::TableRegistry;
use crate::backend::state::State;
use crate::backend::table::TableSchema;
use crate::backend::tables;
use crate::util::error;
use crate::util::notify::{Event, Notifier};

const SORT_COLUMN: &str = "sortColumn";
const SORT_ORDER: &str = "sortOrder";
const VISIBLE_COLUMNS: &str = "visibleColumns";

/// A sorted snapshot of a table for display, restricted to the visible columns.
///
/// Sort column, sort order and visible columns survive restarts through [`State`].
/// Columns are addressed by their display name: enumerated columns appear as `<column>_label`
/// and hold the label rather than the stored value.
pub struct TableModel<'a> {
    access: TableAccess<'a>,
    state: State<'a>,
    sort_column: String,
    sort_order: SortOrder,
    visible_columns: Vec<String>,
    /// Every column of every row, ordered as `all_columns`.
    rows: Vec<Vec<String>>,
    all_columns: Vec<String>,
}

impl<'a> TableModel<'a> {
    /// Builds the model for a registered table, restores its preferences and loads its rows.
    pub fn new(conn: &'a Connection, registry: &'a TableRegistry, table_name: &str, notifier: Rc<dyn Notifier>) -> Result<Self, error::Error> {
        let schema = registry.fetch(table_name).ok_or_else(|| error::Error::UnknownTable(table_name.to_string()))?;
        let states = registry.fetch(tables::STATES).ok_or_else(|| error::Error::UnknownTable(tables::STATES.to_string()))?;

        let mut model = Self {
            access: TableAccess::new(conn, schema, notifier),
            state: State::new(conn, states, format!("{table_name}TableModel")),
            sort_column: String::new(),
            sort_order: SortOrder::Ascending,
            visible_columns: Vec::new(),
            rows: Vec::new(),
            all_columns: schema.column_names(true, LabelMode::Suffixed),
        };
        model.restore_preferences();
        model.refresh("");
        return Ok(model);
    }

    fn schema(&self) -> &'a TableSchema {
        return self.access.schema();
    }

    /// Reads persisted preferences, resetting any that no longer name valid columns.
    fn restore_preferences(&mut self) {
        let schema = self.schema();
        let default_sort = self.default_sort();

        // Step 1: sort column and order
        self.sort_column = self.state.restore(SORT_COLUMN, &default_sort);
        self.sort_order = self.state.restore_sort_order(SORT_ORDER, SortOrder::Ascending);
        if !schema.is_column_valid(&self.sort_column, true) {
            tracing::info!("{} stale sort column {} reset to {}", schema.table_name(), self.sort_column, default_sort);
            self.sort_column = default_sort;
            self.sort_order = SortOrder::Ascending;
            self.state.save(SORT_COLUMN, &self.sort_column);
            self.state.save_sort_order(SORT_ORDER, self.sort_order);
        }

        // Step 2: visible columns
        let default_columns = schema.column_names(false, LabelMode::Suffixed);
        self.visible_columns = self.state.restore_string_list(VISIBLE_COLUMNS, &default_columns);
        if self.visible_columns.is_empty() || !schema.is_column_list_valid(&self.visible_columns, true) {
            tracing::info!("{} stale visible columns {:?} reset to defaults", schema.table_name(), self.visible_columns);
            self.visible_columns = default_columns;
            self.state.save_string_list(VISIBLE_COLUMNS, &self.visible_columns);
        }
    }

    /// The first non-key column, by display name.
    pub fn default_sort(&self) -> String {
        let schema = self.schema();
        return schema.column_names(false, LabelMode::Suffixed).into_iter().next()
            .or_else(|| schema.primary_key(false))
            .unwrap_or_default();
    }

    pub fn sort_column(&self) -> &str {
        return &self.sort_column;
    }

    pub fn sort_order(&self) -> SortOrder {
        return self.sort_order;
    }

    pub fn visible_columns(&self) -> &[String] {
        return &self.visible_columns;
    }

    pub fn error(&self) -> &str {
        return self.access.error();
    }

    /// Sorts by `column`: the current sort column toggles its order, any other valid column
    /// sorts ascending, and an unknown column falls back to the default sort.
    /// Returns the row of `target_id` after the refresh.
    pub fn sort_by(&mut self, column: &str, target_id: &str) -> Option<usize> {
        if column == self.sort_column {
            self.sort_order = self.sort_order.toggled();
        } else if !self.schema().is_column_valid(column, true) {
            tracing::warn!("{} unknown sort column {}, sorting by {}", self.schema().table_name(), column, self.default_sort());
            self.sort_column = self.default_sort();
            self.sort_order = SortOrder::Ascending;
        } else {
            self.sort_column = column.to_string();
            self.sort_order = SortOrder::Ascending;
        }

        self.state.save(SORT_COLUMN, &self.sort_column);
        self.state.save_sort_order(SORT_ORDER, self.sort_order);
        self.access.reporter().emit(Event::SortChanged {
            column: self.sort_column.clone(),
            order: self.sort_order
        });
        return self.refresh(target_id);
    }

    /// Shows the valid subset of `requested`, in declaration order.
    /// Returns whether the visible set changed.
    pub fn set_visible_columns<S: AsRef<str>>(&mut self, requested: &[S]) -> bool {
        let effective: Vec<String> = self.all_columns.iter()
            .filter(|name| requested.iter().any(|r| r.as_ref() == name.as_str()))
            .cloned()
            .collect();
        if effective == self.visible_columns {
            return false;
        }

        self.visible_columns = effective;
        self.state.save_string_list(VISIBLE_COLUMNS, &self.visible_columns);
        self.access.reporter().emit(Event::VisibleColumnsChanged { columns: self.visible_columns.clone() });
        self.access.reporter().emit(Event::ModelReset);
        return true;
    }

    /// Reloads every row in the current sort order.
    /// Returns the row whose primary key is `target_id`, if present.
    pub fn refresh(&mut self, target_id: &str) -> Option<usize> {
        let sort_column = self.sort_column.clone();
        let result = self.access.try_select(&[], Some(&sort_column), self.sort_order, true);
        match result {
            Ok(records) => {
                self.rows = records.iter()
                    .map(|record| self.all_columns.iter()
                        .map(|name| record.get(name).map(|v| v.to_string()).unwrap_or_default())
                        .collect())
                    .collect();
                self.access.reporter().emit(Event::ModelReset);
                self.access.reporter().success("successful query by", &sort_column);
            },
            Err(e) => {
                self.rows.clear();
                self.access.reporter().emit(Event::ModelReset);
                self.access.reporter().fail(format!("failed query: {e}"));
                return None;
            }
        }

        if target_id.is_empty() {
            return None;
        }
        return (0..self.rows.len()).find(|&row| self.id(row) == Some(target_id));
    }

    fn data_index(&self, name: &str) -> Option<usize> {
        return self.all_columns.iter().position(|c| c == name);
    }

    /// Display text of a visible column in a row.
    pub fn data(&self, row: usize, column: usize) -> Option<&str> {
        let index = self.data_index(self.visible_columns.get(column)?)?;
        return self.rows.get(row)?.get(index).map(String::as_str);
    }

    /// Primary key of a row.
    pub fn id(&self, row: usize) -> Option<&str> {
        let index = self.data_index(&self.schema().primary_key(false)?)?;
        return self.rows.get(row)?.get(index).map(String::as_str);
    }

    pub fn row_count(&self) -> usize {
        return self.rows.len();
    }

    pub fn column_count(&self) -> usize {
        return self.visible_columns.len();
    }

    /// Schema column behind a display name.
    fn column_definition(&self, name: &str) -> Option<&'a ColumnDefinition> {
        let schema = self.schema();
        return schema.column(name).or_else(|| {
            name.strip_suffix(LABEL_SUFFIX)
                .and_then(|raw| schema.column(raw))
                .filter(|c| c.enum_constraint().is_some())
        });
    }

    pub fn header_title(&self, section: usize) -> Option<String> {
        let name = self.visible_columns.get(section)?;
        return self.column_definition(name).map(|c| c.title.clone());
    }

    pub fn column_names(&self) -> Vec<String> {
        return self.visible_columns.clone();
    }

    pub fn column_titles(&self) -> Vec<String> {
        return (0..self.visible_columns.len()).filter_map(|i| self.header_title(i)).collect();
    }

    /// Logical types of the visible columns. Labels of enumerated columns are text.
    pub fn column_types(&self) -> Vec<ColumnType> {
        return self.visible_columns.iter()
            .filter_map(|name| self.column_definition(name).map(|c| {
                if name.as_str() != c.name { ColumnType::String } else { c.column_type }
            }))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use pretty_assertions::assert_eq;
    use crate::backend::column_type::Dialect;
    use crate::backend::db;
    use crate::backend::value::{Record, Value};
    use crate::util::logging;
    use crate::util::notify::quiet;

    fn setup() -> (Connection, TableRegistry) {
        let conn = db::open_in_memory().unwrap();
        let registry = TableRegistry::new(Dialect::Sqlite);
        db::initialize_schema(&conn, &registry).unwrap();
        return (conn, registry);
    }

    fn add_category(conn: &Connection, registry: &TableRegistry, name: &str, kind: i64) -> String {
        let mut access = TableAccess::new(conn, registry.fetch(tables::CATEGORIES).unwrap(), quiet());
        let mut data = Record::new();
        data.insert("name".to_string(), Value::from(name));
        data.insert("type".to_string(), Value::Int(kind));
        return access.add(&data).unwrap();
    }

    #[test]
    fn defaults_on_first_use() {
        let (conn, registry) = setup();
        let model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        assert_eq!(model.sort_column(), "name");
        assert_eq!(model.sort_order(), SortOrder::Ascending);
        assert_eq!(model.visible_columns(), &["name", "description", "type_label"]);
        assert_eq!(model.column_titles(), vec!["Category", "Description", "Type"]);
        assert_eq!(model.column_types(), vec![ColumnType::String, ColumnType::String, ColumnType::String]);
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn unknown_table_is_an_error() {
        let (conn, registry) = setup();
        assert!(matches!(TableModel::new(&conn, &registry, "Nope", quiet()), Err(error::Error::UnknownTable(_))));
    }

    #[test]
    fn sort_toggles_on_same_column() {
        let (conn, registry) = setup();
        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();

        model.sort_by("name", "");
        assert_eq!(model.sort_order(), SortOrder::Descending);
        model.sort_by("name", "");
        assert_eq!(model.sort_order(), SortOrder::Ascending);
    }

    #[test]
    fn unknown_sort_column_falls_back() {
        let (conn, registry) = setup();
        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();

        model.sort_by("type_label", "");
        model.sort_by("type_label", "");
        assert_eq!(model.sort_order(), SortOrder::Descending);

        model.sort_by("bogus", "");
        assert_eq!(model.sort_column(), "name");
        assert_eq!(model.sort_order(), SortOrder::Ascending);
    }

    #[test]
    fn unknown_sort_column_is_logged() {
        let (conn, registry) = setup();
        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        let logged = logging::capture(|| {
            model.sort_by("bogus", "");
        });
        assert!(logged.contains("WARN"));
        assert!(logged.contains("Categories unknown sort column bogus, sorting by name"));
    }

    #[test]
    fn stale_sort_column_is_logged() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "CategoriesTableModel");
        state.save(SORT_COLUMN, "dropped_column");
        let logged = logging::capture(|| {
            TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        });
        assert!(logged.contains("Categories stale sort column dropped_column reset to name"));
    }

    #[test]
    fn refresh_finds_target_row() {
        let (conn, registry) = setup();
        add_category(&conn, &registry, "Salary", 0);
        let rent = add_category(&conn, &registry, "Rent", 1);
        add_category(&conn, &registry, "Groceries", 1);

        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        assert_eq!(model.refresh(&rent), Some(1));
        assert_eq!(model.data(0, 0), Some("Groceries"));
        assert_eq!(model.data(2, 2), Some("Income"));
        assert_eq!(model.id(1), Some(rent.as_str()));
        assert_eq!(model.refresh("missing"), None);

        assert_eq!(model.sort_by("name", &rent), Some(1));
        assert_eq!(model.data(0, 0), Some("Salary"));
    }

    #[test]
    fn preferences_survive_a_new_model() {
        let (conn, registry) = setup();
        {
            let mut model = TableModel::new(&conn, &registry, tables::VENDORS, quiet()).unwrap();
            model.sort_by("city", "");
            model.sort_by("city", "");
            model.set_visible_columns(&["city", "name"]);
        }
        let model = TableModel::new(&conn, &registry, tables::VENDORS, quiet()).unwrap();
        assert_eq!(model.sort_column(), "city");
        assert_eq!(model.sort_order(), SortOrder::Descending);
        assert_eq!(model.visible_columns(), &["name", "city"]);
        assert_eq!(model.header_title(1).as_deref(), Some("City"));
    }

    #[test]
    fn stale_preferences_are_reset() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "VendorsTableModel");
        state.save(SORT_COLUMN, "fax");
        state.save_sort_order(SORT_ORDER, SortOrder::Descending);
        state.save_string_list(VISIBLE_COLUMNS, &["name".to_string(), "fax".to_string()]);

        let model = TableModel::new(&conn, &registry, tables::VENDORS, quiet()).unwrap();
        let default_sort = model.default_sort();
        assert_eq!(default_sort, "category_id");
        assert_eq!(model.sort_column(), default_sort);
        assert_eq!(model.sort_order(), SortOrder::Ascending);
        assert_eq!(model.visible_columns(), registry.fetch(tables::VENDORS).unwrap().column_names(false, LabelMode::Suffixed).as_slice());
        assert_eq!(state.restore(SORT_COLUMN, ""), default_sort);
        assert_eq!(state.restore_sort_order(SORT_ORDER, SortOrder::Descending), SortOrder::Ascending);
    }

    #[test]
    fn stale_sort_column_resets_saved_order() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "CategoriesTableModel");
        state.save(SORT_COLUMN, "dropped_column");
        state.save_sort_order(SORT_ORDER, SortOrder::Descending);

        let model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        assert_eq!(model.sort_column(), "name");
        assert_eq!(model.sort_order(), SortOrder::Ascending);
    }

    #[test]
    fn valid_sort_column_keeps_saved_order() {
        let (conn, registry) = setup();
        let mut state = State::new(&conn, registry.fetch(tables::STATES).unwrap(), "CategoriesTableModel");
        state.save(SORT_COLUMN, "description");
        state.save_sort_order(SORT_ORDER, SortOrder::Descending);

        let model = TableModel::new(&conn, &registry, tables::CATEGORIES, quiet()).unwrap();
        assert_eq!(model.sort_column(), "description");
        assert_eq!(model.sort_order(), SortOrder::Descending);
    }

    #[test]
    fn visible_columns_signal_only_on_change() {
        let (conn, registry) = setup();
        let events: Rc<RefCell<Vec<Event>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, Rc::new(move |e: &Event| sink.borrow_mut().push(e.clone()))).unwrap();
        events.borrow_mut().clear();

        assert!(model.set_visible_columns(&["type_label", "bogus", "name"]));
        assert_eq!(model.visible_columns(), &["name", "type_label"]);
        assert_eq!(model.column_count(), 2);
        assert_eq!(events.borrow().len(), 2);

        assert!(!model.set_visible_columns(&["name", "type_label"]));
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn sort_emits_sort_changed() {
        let (conn, registry) = setup();
        let events: Rc<RefCell<Vec<Event>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let mut model = TableModel::new(&conn, &registry, tables::CATEGORIES, Rc::new(move |e: &Event| sink.borrow_mut().push(e.clone()))).unwrap();
        events.borrow_mut().clear();

        model.sort_by("description", "");
        assert_eq!(events.borrow()[0], Event::SortChanged { column: "description".to_string(), order: SortOrder::Ascending });
        assert_eq!(events.borrow()[1], Event::ModelReset);
    }
}
