mod parser;
mod schema;

pub use parser::{FieldDocument, parse_field_document};
pub use schema::{
    DEFAULT_MAX_NESTING_DEPTH, FieldKind, FieldSchema, RepeatableField, ScalarKind,
};
