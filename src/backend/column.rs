use std::collections::BTreeMap;
use crate::backend::column_type::ColumnType;

/// Label returned for enumerated values that have no mapping.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone, Debug, PartialEq)]
/// Default applied by the database when a column is omitted from an insert.
pub enum DefaultValue {
    /// A logical value, coerced to the column's type.
    Literal(String),
    /// A server-generated UUID.
    GeneratedUuid,
}

#[derive(Clone, Debug, PartialEq, Default)]
/// Closed value domain of an integer column: value to label, in insertion order.
pub struct EnumConstraint {
    value_labels: Vec<(i64, String)>
}

impl EnumConstraint {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Builder: map a value to a label. Re-mapping a value replaces its label in place.
    pub fn with(mut self, value: i64, label: impl Into<String>) -> Self {
        let label = label.into();
        match self.value_labels.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => { entry.1 = label; },
            None => { self.value_labels.push((value, label)); }
        }
        return self;
    }

    /// Valid values, in insertion order.
    pub fn allowed_values(&self) -> Vec<i64> {
        return self.value_labels.iter().map(|(v, _)| *v).collect();
    }

    /// Label for a value, or "Unknown" when the value is not mapped.
    pub fn label_for(&self, value: i64) -> &str {
        return self.value_labels.iter()
            .find(|(v, _)| *v == value)
            .map(|(_, label)| label.as_str())
            .unwrap_or(UNKNOWN_LABEL);
    }

    pub fn as_label_map(&self) -> BTreeMap<i64, String> {
        return self.value_labels.iter().cloned().collect();
    }

    /// Pairs in insertion order.
    pub fn entries(&self) -> &[(i64, String)] {
        return &self.value_labels;
    }

    pub fn is_empty(&self) -> bool {
        return self.value_labels.is_empty();
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Value-domain constraint attached to a column.
pub enum ColumnConstraint {
    Enum(EnumConstraint),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub title: String,
    pub column_type: ColumnType,
    /// Type as written in DDL, e.g. "UUID", "TEXT", "SMALLINT".
    pub sql_type: String,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_nullable: bool,
    pub default_value: Option<DefaultValue>,
    pub constraint: Option<ColumnConstraint>,
}

impl ColumnDefinition {
    /// A nullable column with no default and no constraint.
    pub fn new(name: impl Into<String>, title: impl Into<String>, column_type: ColumnType, sql_type: impl Into<String>) -> Self {
        return Self {
            name: name.into(),
            title: title.into(),
            column_type,
            sql_type: sql_type.into(),
            is_primary_key: false,
            is_auto_increment: false,
            is_nullable: true,
            default_value: None,
            constraint: None,
        };
    }

    /// Builder: mark as the primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        return self;
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        return self;
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        return self;
    }

    /// Builder: literal default. An empty string means no default.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.default_value = if value.is_empty() { None } else { Some(DefaultValue::Literal(value)) };
        return self;
    }

    pub fn generated_uuid(mut self) -> Self {
        self.default_value = Some(DefaultValue::GeneratedUuid);
        return self;
    }

    pub fn constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraint = Some(constraint);
        return self;
    }

    /// The enumeration constraint, if this column carries a non-empty one.
    pub fn enum_constraint(&self) -> Option<&EnumConstraint> {
        return match &self.constraint {
            Some(ColumnConstraint::Enum(e)) if !e.is_empty() => Some(e),
            _ => None
        };
    }

    pub fn placeholder(&self) -> String {
        return format!(":{}", self.name);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Action taken on the referencing rows when a referenced row is deleted or updated.
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        return match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
        };
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKey {
    pub local_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Short alias for the referenced table when it is joined.
    pub alias: Option<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    pub fn new(local_column: impl Into<String>, referenced_table: impl Into<String>, referenced_column: impl Into<String>) -> Self {
        return Self {
            local_column: local_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            alias: None,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        };
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        return self;
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        return self;
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        return self;
    }
}
