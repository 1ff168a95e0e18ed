#![deny(rust_2018_idioms)]

mod app;
mod domain;
mod form;
mod io;
mod presentation;

pub use app::{RepeatUI, UiOptions};
pub use domain::{
    DEFAULT_MAX_NESTING_DEPTH, FieldDocument, FieldKind, FieldSchema, RepeatableField, ScalarKind,
    parse_field_document,
};
pub use form::{
    ErrorMap, FieldValue, FormController, ImmediateSettle, ParsedPath, Record, RecordId,
    RenderSettle, RepeatableState, ValidationReport, error_subset, order_keys, parse_path,
    route_to_first_error,
};
pub use io::{DocumentFormat, OutputDestination, OutputOptions, emit, parse_document_str};

pub mod prelude {
    pub use super::{RepeatUI, UiOptions};
}
