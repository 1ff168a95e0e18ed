mod controller;
mod path;
mod repeatable;
mod router;
mod value;

pub use controller::{FormController, ValidationReport};
pub use path::{ErrorMap, ParsedPath, error_subset, item_path, order_keys, parse_path};
pub use repeatable::RepeatableState;
pub use router::{ImmediateSettle, RenderSettle, route_to_first_error};
pub use value::{FieldValue, Record, RecordId};
