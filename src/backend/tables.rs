//! Table definitions of the finance application.

use crate::backend::column::{ColumnConstraint, ColumnDefinition, EnumConstraint, ForeignKey, ReferentialAction};
use crate::backend::column_type::{ColumnType, Dialect};
use crate::backend::table::TableSchema;

pub const CATEGORIES: &str = "Categories";
pub const VENDORS: &str = "Vendors";
/// Key/value store backing persisted UI preferences.
pub const STATES: &str = "States";

/// Primary key shared by every table: a UUID generated by the database when omitted.
fn id_column() -> ColumnDefinition {
    return ColumnDefinition::new("id", "id", ColumnType::String, "UUID").primary_key().generated_uuid();
}

fn text_column(name: &str, title: &str) -> ColumnDefinition {
    return ColumnDefinition::new(name, title, ColumnType::String, "TEXT");
}

pub fn categories(dialect: Dialect) -> TableSchema {
    let mut schema = TableSchema::with_dialect(CATEGORIES, dialect);
    schema.add_column(id_column());
    schema.add_column(text_column("name", "Category").not_null());
    schema.add_column(text_column("description", "Description"));
    schema.add_column(ColumnDefinition::new("type", "Type", ColumnType::Int, "SMALLINT")
        .not_null()
        .default_value("1")
        .constraint(ColumnConstraint::Enum(EnumConstraint::new()
            .with(0, "Income")
            .with(1, "Expense"))));
    return schema;
}

pub fn vendors(dialect: Dialect) -> TableSchema {
    let mut schema = TableSchema::with_dialect(VENDORS, dialect);
    schema.add_column(id_column());
    schema.add_column(ColumnDefinition::new("category_id", "Category", ColumnType::String, "UUID"));
    schema.add_column(text_column("name", "Vendor").not_null());
    schema.add_column(text_column("address1", "Address 1"));
    schema.add_column(text_column("address2", "Address 2"));
    schema.add_column(text_column("city", "City"));
    schema.add_column(text_column("state", "State"));
    schema.add_column(text_column("postal_code", "Postal Code"));
    schema.add_column(text_column("phone", "Phone"));
    schema.add_column(ColumnDefinition::new("unpaid_balance", "Unpaid Balance", ColumnType::Currency, "NUMERIC(12,2)")
        .not_null()
        .default_value("0"));
    schema.add_foreign_key(ForeignKey::new("category_id", CATEGORIES, "id")
        .alias("cat")
        .on_delete(ReferentialAction::Restrict)
        .on_update(ReferentialAction::Cascade));
    return schema;
}

pub fn states(dialect: Dialect) -> TableSchema {
    let mut schema = TableSchema::with_dialect(STATES, dialect);
    schema.add_column(id_column());
    schema.add_column(text_column("object", "Object").not_null());
    schema.add_column(text_column("property_name", "Property").not_null());
    schema.add_column(text_column("property_value", "Value"));
    schema.add_unique(&["object", "property_name"]);
    return schema;
}
