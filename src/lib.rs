mod backend;
mod util;

pub use backend::Backend;
pub use backend::column::{ColumnConstraint, ColumnDefinition, DefaultValue, EnumConstraint, ForeignKey, ReferentialAction, UNKNOWN_LABEL};
pub use backend::column_type::{ColumnType, Dialect, LabelMode, SortOrder, LABEL_SUFFIX};
pub use backend::data::TableAccess;
pub use backend::db;
pub use backend::filter::{format_value, quote, FilterCondition, FilterOperator};
pub use backend::registry::TableRegistry;
pub use backend::state::State;
pub use backend::table::TableSchema;
pub use backend::table_data::TableModel;
pub use backend::tables;
pub use backend::value::{Record, Value};
pub use util::config::DatabaseConfig;
pub use util::error::Error;
pub use util::logging;
pub use util::notify::{quiet, ChannelNotifier, Event, Notifier, QuietNotifier, Reporter};
