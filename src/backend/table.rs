//! Declarative table schemas and the SQL generated from them.
//!
//! A [`TableSchema`] is built once at startup by appending columns, foreign keys and unique
//! keys. Every statement the data-access layer runs is produced here as text with named
//! `:column` placeholders; nothing in this module touches a connection.

use crate::backend::column::{ColumnDefinition, DefaultValue, EnumConstraint, ForeignKey, UNKNOWN_LABEL};
use crate::backend::column_type::{ColumnType, Dialect, LabelMode, SortOrder, LABEL_SUFFIX};
use crate::backend::filter::{format_value, quote, FilterCondition, FilterOperator};
use crate::backend::value::{parse_date, Record, Value};

#[derive(Clone, Debug)]
pub struct TableSchema {
    table_name: String,
    dialect: Dialect,
    columns: Vec<ColumnDefinition>,
    foreign_keys: Vec<ForeignKey>,
    unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    /// An empty schema generating PostgreSQL DDL.
    pub fn new(table_name: impl Into<String>) -> Self {
        return Self::with_dialect(table_name, Dialect::Postgres);
    }

    pub fn with_dialect(table_name: impl Into<String>, dialect: Dialect) -> Self {
        return Self {
            table_name: table_name.into(),
            dialect,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            unique_keys: Vec::new(),
        };
    }

    /// Appends a column. Callers must not register the same column name twice.
    pub fn add_column(&mut self, column: ColumnDefinition) {
        self.columns.push(column);
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.foreign_keys.push(foreign_key);
    }

    /// Declares that the given columns are unique together.
    pub fn add_unique(&mut self, columns: &[&str]) {
        self.unique_keys.push(columns.iter().map(|c| c.to_string()).collect());
    }

    pub fn table_name(&self) -> &str {
        return &self.table_name;
    }

    pub fn dialect(&self) -> Dialect {
        return self.dialect;
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        return &self.columns;
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        return &self.foreign_keys;
    }

    pub fn unique_keys(&self) -> &[Vec<String>] {
        return &self.unique_keys;
    }

    pub fn column_count(&self) -> usize {
        return self.columns.len();
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        return self.columns.iter().find(|c| c.name == name);
    }

    fn visible(&self, include_primary_key: bool) -> impl Iterator<Item = &ColumnDefinition> {
        return self.columns.iter().filter(move |c| include_primary_key || !c.is_primary_key);
    }

    /// Column identifiers in declaration order, with enumerated columns surfaced per `mode`.
    pub fn column_names(&self, include_primary_key: bool, mode: LabelMode) -> Vec<String> {
        return self.visible(include_primary_key)
            .map(|column| match (column.enum_constraint(), mode) {
                (Some(_), LabelMode::Suffixed) => format!("{}{LABEL_SUFFIX}", column.name),
                (Some(e), LabelMode::Expression) => format!("{} AS {}{LABEL_SUFFIX}", Self::enum_clause(&column.name, e), column.name),
                _ => column.name.clone()
            })
            .collect();
    }

    pub fn column_placeholders(&self, include_primary_key: bool) -> Vec<String> {
        return self.visible(include_primary_key).map(|c| c.placeholder()).collect();
    }

    pub fn column_titles(&self, include_primary_key: bool) -> Vec<String> {
        return self.visible(include_primary_key).map(|c| c.title.clone()).collect();
    }

    pub fn column_types(&self, include_primary_key: bool) -> Vec<ColumnType> {
        return self.visible(include_primary_key).map(|c| c.column_type).collect();
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDefinition> {
        return self.columns.iter().find(|c| c.is_primary_key);
    }

    /// Name of the primary key column, or its placeholder.
    pub fn primary_key(&self, as_placeholder: bool) -> Option<String> {
        return self.primary_key_column().map(|c| if as_placeholder { c.placeholder() } else { c.name.clone() });
    }

    /// Strips the leading `:` from a placeholder.
    pub fn to_name<'p>(&self, placeholder: &'p str) -> &'p str {
        return placeholder.strip_prefix(':').unwrap_or(placeholder);
    }

    /// The first non-primary-key column in declaration order.
    pub fn default_sort(&self) -> Option<&str> {
        return self.columns.iter().find(|c| !c.is_primary_key).map(|c| c.name.as_str());
    }

    /// Values for a new-record form: every non-primary-key column with its default coerced to its type.
    pub fn initialize_defaults(&self) -> Record {
        let mut record = Record::new();
        for column in self.visible(false) {
            let literal = match &column.default_value {
                Some(DefaultValue::Literal(s)) => Some(s.as_str()),
                _ => None
            };
            let value = match column.column_type {
                ColumnType::String => Value::Text(literal.unwrap_or("").to_string()),
                ColumnType::Int => Value::Int(literal.and_then(|s| s.trim().parse().ok()).unwrap_or(0)),
                ColumnType::Date => match literal.and_then(parse_date) {
                    Some(d) => Value::Date(d),
                    None => Value::Int(literal.and_then(|s| s.trim().parse().ok()).unwrap_or(0))
                },
                ColumnType::Currency | ColumnType::Float => Value::Float(literal.and_then(|s| s.trim().parse().ok()).unwrap_or(0.0)),
            };
            record.insert(column.name.clone(), value);
        }
        return record;
    }

    /// Whether `name` is a known column, as a raw name or (with labels) a label-suffixed one.
    pub fn is_column_valid(&self, name: &str, use_labels: bool) -> bool {
        return self.column_names(true, LabelMode::from_use_labels(use_labels)).iter().any(|n| n == name);
    }

    pub fn is_column_list_valid<S: AsRef<str>>(&self, names: &[S], use_labels: bool) -> bool {
        let known = self.column_names(true, LabelMode::from_use_labels(use_labels));
        return names.iter().all(|name| known.iter().any(|n| n == name.as_ref()));
    }

    pub fn check_constraint_name(&self, column_name: &str) -> String {
        return format!("chk_{}_{}", self.table_name, column_name);
    }

    pub fn foreign_key_name(&self, local_column: &str) -> String {
        return format!("fk_{}_{}", self.table_name, local_column);
    }

    pub fn unique_constraint_name(&self, columns: &[String]) -> String {
        return format!("uq_{}_{}", self.table_name, columns.join("_"));
    }

    pub fn count_sql(&self) -> String {
        return format!("SELECT COUNT(*) FROM {}", self.table_name);
    }

    fn column_definition_sql(&self, column: &ColumnDefinition) -> String {
        let mut def = format!("{} {}", column.name, column.sql_type);
        if column.is_primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if column.is_auto_increment {
            def.push(' ');
            def.push_str(self.dialect.auto_increment());
        }
        if !column.is_nullable {
            def.push_str(" NOT NULL");
        }
        match &column.default_value {
            Some(DefaultValue::GeneratedUuid) => {
                def.push_str(" DEFAULT ");
                def.push_str(self.dialect.generated_uuid());
            },
            Some(DefaultValue::Literal(s)) => {
                let value = Value::from(s.as_str()).coerce(&column.column_type);
                def.push_str(" DEFAULT ");
                def.push_str(&format_value(&value, &column.column_type));
            },
            None => {}
        }
        return def;
    }

    fn check_definition_sql(column_name: &str, constraint: &EnumConstraint) -> String {
        let values: Vec<String> = constraint.allowed_values().iter().map(|v| v.to_string()).collect();
        return format!("CHECK ({} IN ({}))", column_name, values.join(", "));
    }

    fn foreign_key_definition_sql(foreign_key: &ForeignKey) -> String {
        return format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            foreign_key.local_column,
            foreign_key.referenced_table,
            foreign_key.referenced_column,
            foreign_key.on_delete.as_sql(),
            foreign_key.on_update.as_sql()
        );
    }

    /// Columns carrying a non-empty enumeration that CHECK constraints are generated for.
    fn enumerated_columns(&self) -> impl Iterator<Item = (&ColumnDefinition, &EnumConstraint)> {
        return self.columns.iter()
            .filter(|c| c.column_type == ColumnType::Int)
            .filter_map(|c| c.enum_constraint().map(|e| (c, e)));
    }

    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = self.columns.iter().map(|c| self.column_definition_sql(c)).collect();

        for columns in &self.unique_keys {
            defs.push(format!("CONSTRAINT {} UNIQUE ({})", self.unique_constraint_name(columns), columns.join(", ")));
        }

        // Dialects without guarded ALTER TABLE blocks get every constraint inline
        if !self.dialect.has_guarded_constraints() {
            for (column, constraint) in self.enumerated_columns() {
                defs.push(format!("CONSTRAINT {} {}", self.check_constraint_name(&column.name), Self::check_definition_sql(&column.name, constraint)));
            }
            for foreign_key in &self.foreign_keys {
                defs.push(format!("CONSTRAINT {} {}", self.foreign_key_name(&foreign_key.local_column), Self::foreign_key_definition_sql(foreign_key)));
            }
        }

        return format!("CREATE TABLE IF NOT EXISTS {} ({});", self.table_name, defs.join(", "));
    }

    /// A block adding a named constraint unless the catalog already holds one matching `guard`.
    fn guarded_constraint_sql(&self, constraint_name: &str, guard: &str, definition: &str) -> String {
        return format!(
            "DO $$\nBEGIN\n    IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE {guard}) THEN\n        ALTER TABLE {} ADD CONSTRAINT {constraint_name} {definition};\n    END IF;\nEND $$;",
            self.table_name
        );
    }

    /// Guarded blocks adding a CHECK constraint for every enumerated Int column.
    /// Existing constraints are matched by name, case-insensitively.
    pub fn create_column_constraint_sql(&self) -> String {
        if !self.dialect.has_guarded_constraints() {
            return String::new();
        }
        let blocks: Vec<String> = self.enumerated_columns()
            .map(|(column, constraint)| {
                let name = self.check_constraint_name(&column.name);
                let guard = format!("lower(conname) = lower({})", quote(&name));
                self.guarded_constraint_sql(&name, &guard, &Self::check_definition_sql(&column.name, constraint))
            })
            .collect();
        return blocks.join("\n");
    }

    /// Guarded blocks adding every registered foreign key.
    pub fn create_foreign_key_sql(&self) -> String {
        if !self.dialect.has_guarded_constraints() {
            return String::new();
        }
        let blocks: Vec<String> = self.foreign_keys.iter()
            .map(|foreign_key| {
                let name = self.foreign_key_name(&foreign_key.local_column);
                // Unquoted names are stored folded to lower case
                let guard = format!("conname = {}", quote(&name.to_lowercase()));
                self.guarded_constraint_sql(&name, &guard, &Self::foreign_key_definition_sql(foreign_key))
            })
            .collect();
        return blocks.join("\n");
    }

    /// Guarded blocks adding every unique key, for tables that predate it.
    pub fn create_unique_constraint_sql(&self) -> String {
        if !self.dialect.has_guarded_constraints() {
            return String::new();
        }
        let blocks: Vec<String> = self.unique_keys.iter()
            .map(|columns| {
                let name = self.unique_constraint_name(columns);
                let guard = format!("conname = {}", quote(&name.to_lowercase()));
                self.guarded_constraint_sql(&name, &guard, &format!("UNIQUE ({})", columns.join(", ")))
            })
            .collect();
        return blocks.join("\n");
    }

    fn primary_key_predicate(&self) -> String {
        let name = self.primary_key(false).unwrap_or_default();
        let placeholder = self.primary_key(true).unwrap_or_default();
        return format!("{name} = {placeholder}");
    }

    pub fn delete_sql(&self) -> String {
        return format!("DELETE FROM {} WHERE {}", self.table_name, self.primary_key_predicate());
    }

    /// Columns an insert of `data` lists: the primary key plus every column present in `data`.
    pub fn insert_columns(&self, data: &Record) -> Vec<&ColumnDefinition> {
        return self.columns.iter().filter(|c| c.is_primary_key || data.contains_key(&c.name)).collect();
    }

    /// Columns an update of `data` assigns: every non-primary-key column present in `data`.
    pub fn update_columns(&self, data: &Record) -> Vec<&ColumnDefinition> {
        return self.columns.iter().filter(|c| !c.is_primary_key && data.contains_key(&c.name)).collect();
    }

    pub fn insert_sql(&self, data: &Record) -> String {
        let columns = self.insert_columns(data);
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| c.placeholder()).collect();
        return format!("INSERT INTO {} ({}) VALUES ({})", self.table_name, names.join(", "), placeholders.join(", "));
    }

    fn projection(&self, use_labels: bool) -> String {
        let mode = if use_labels { LabelMode::Expression } else { LabelMode::Raw };
        return self.column_names(true, mode).join(", ");
    }

    /// Selects the single row matching the primary key placeholder.
    pub fn select_sql(&self, use_labels: bool) -> String {
        return format!("SELECT {} FROM {} WHERE {}", self.projection(use_labels), self.table_name, self.primary_key_predicate());
    }

    pub fn select_filtered_sql(&self, filters: &[FilterCondition], use_labels: bool) -> String {
        return self.select_sorted_sql(filters, None, SortOrder::Ascending, use_labels);
    }

    /// Selects every row matching `filters`, ordered by `sort_column` when it names a known column.
    pub fn select_sorted_sql(&self, filters: &[FilterCondition], sort_column: Option<&str>, sort_order: SortOrder, use_labels: bool) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.projection(use_labels), self.table_name);

        let where_clause = self.where_clause(filters);
        if !where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&where_clause);
        }

        if let Some(sort_column) = sort_column.filter(|s| !s.is_empty()) {
            if self.is_column_valid(sort_column, false) || (use_labels && self.is_column_valid(sort_column, true)) {
                sql.push_str(&format!(" ORDER BY {} {}", sort_column, sort_order.as_sql()));
            } else {
                tracing::warn!("{} unknown sort column dropped: {}", self.table_name, sort_column);
            }
        }
        return sql;
    }

    pub fn update_sql(&self, data: &Record) -> String {
        let assignments: Vec<String> = self.update_columns(data).iter()
            .map(|c| format!("{} = {}", c.name, c.placeholder()))
            .collect();
        return format!("UPDATE {} SET {} WHERE {}", self.table_name, assignments.join(", "), self.primary_key_predicate());
    }

    /// Inserts `data`, or updates the remaining supplied columns of the row matching on `match_columns`.
    ///
    /// The match columns must be covered by a unique key for the conflict target to be accepted
    /// by the database.
    pub fn update_insert_sql(&self, data: &Record, match_columns: &[&str]) -> String {
        let insert = self.insert_sql(data);
        let targets: Vec<&str> = match_columns.iter().copied().filter(|m| self.column(m).is_some()).collect();
        if targets.is_empty() {
            return insert;
        }

        let updates: Vec<String> = self.update_columns(data).iter()
            .filter(|c| !targets.contains(&c.name.as_str()))
            .map(|c| format!("{0} = excluded.{0}", c.name))
            .collect();
        let action = if updates.is_empty() {
            String::from("DO NOTHING")
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        return format!("{} ON CONFLICT ({}) {}", insert, targets.join(", "), action);
    }

    /// Builds `WHERE ...` from the conditions, or an empty string when none apply.
    /// Conditions naming an unknown column, or missing the value their operator needs, are dropped.
    pub fn where_clause(&self, conditions: &[FilterCondition]) -> String {
        let mut terms: Vec<String> = Vec::new();

        for condition in conditions {
            let column = match self.column(&condition.column_name) {
                Some(c) => c,
                None => {
                    tracing::warn!("{} filter on unknown column dropped: {}", self.table_name, condition.column_name);
                    continue;
                }
            };

            match (condition.operator, &condition.value) {
                (operator, _) if !operator.takes_value() => {
                    terms.push(format!("{} {}", column.name, operator.as_sql()));
                },
                (FilterOperator::In, Some(Value::List(items))) => {
                    if items.is_empty() {
                        // Nothing can match an empty list
                        terms.push(String::from("1 = 0"));
                    } else {
                        let literals: Vec<String> = items.iter().map(|v| format_value(v, &column.column_type)).collect();
                        terms.push(format!("{} IN ({})", column.name, literals.join(", ")));
                    }
                },
                (FilterOperator::In, _) => {
                    tracing::warn!("{} IN filter on {} without a list dropped", self.table_name, column.name);
                },
                (operator, Some(value)) => {
                    terms.push(format!("{} {} {}", column.name, operator.as_sql(), format_value(value, &column.column_type)));
                },
                (_, None) => {
                    tracing::warn!("{} filter on {} without a value dropped", self.table_name, column.name);
                }
            }
        }

        if terms.is_empty() {
            return String::new();
        }
        return format!("WHERE {}", terms.join(" AND "));
    }

    /// `CASE column WHEN v THEN 'label' ... ELSE 'Unknown' END`
    pub fn enum_clause(column_name: &str, constraint: &EnumConstraint) -> String {
        let mut clause = format!("CASE {column_name}");
        for (value, label) in constraint.entries() {
            clause.push_str(&format!(" WHEN {} THEN {}", value, quote(label)));
        }
        clause.push_str(&format!(" ELSE {} END", quote(UNKNOWN_LABEL)));
        return clause;
    }
}
