use std::collections::HashMap;
use crate::backend::column_type::Dialect;
use crate::backend::table::TableSchema;
use crate::backend::tables;

/// Owns every table schema, in registration order.
pub struct TableRegistry {
    dialect: Dialect,
    schemas: Vec<TableSchema>,
    index: HashMap<String, usize>,
}

impl TableRegistry {
    /// The application's tables, built once in a fixed order.
    /// Referenced tables come before the tables referencing them.
    pub fn new(dialect: Dialect) -> Self {
        let mut registry = Self::empty(dialect);
        registry.register(tables::categories(dialect));
        registry.register(tables::vendors(dialect));
        registry.register(tables::states(dialect));
        return registry;
    }

    pub fn empty(dialect: Dialect) -> Self {
        return Self {
            dialect,
            schemas: Vec::new(),
            index: HashMap::new(),
        };
    }

    /// Adds a schema. Registering a name twice replaces the earlier schema in place.
    pub fn register(&mut self, schema: TableSchema) {
        match self.index.get(schema.table_name()) {
            Some(&i) => {
                self.schemas[i] = schema;
            },
            None => {
                self.index.insert(schema.table_name().to_string(), self.schemas.len());
                self.schemas.push(schema);
            }
        }
    }

    pub fn fetch(&self, table_name: &str) -> Option<&TableSchema> {
        return self.index.get(table_name).map(|&i| &self.schemas[i]);
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        return self.schemas.iter();
    }

    pub fn dialect(&self) -> Dialect {
        return self.dialect;
    }

    pub fn len(&self) -> usize {
        return self.schemas.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.schemas.is_empty();
    }
}
