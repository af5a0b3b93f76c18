mod config;
mod field;
mod record;

pub use config::{ConfigError, FieldConfig, parse_field_configs};
pub use field::{FieldDefinition, FieldKey, FieldKind};
pub(crate) use field::tag_list;
pub use record::{Fields, RecordId};
