use indexmap::IndexMap;
use jsonschema::Validator;
use serde_json::{Map, Value, json};

use crate::domain::{FieldKind, FieldSchema, RepeatableField, ScalarKind};

use super::path::ErrorMap;
use super::repeatable::RepeatableState;
use super::value::{FieldValue, coerce_child_value, zero_scalar};

/// Owns the top-level fields of one form: scalar values plus one
/// `RepeatableState` per repeatable field. All construction context is passed
/// in explicitly; there is no ambient field registry.
#[derive(Debug)]
pub struct FormController {
    fields: Vec<FieldSchema>,
    scalars: IndexMap<String, FieldValue>,
    repeatables: IndexMap<String, RepeatableState>,
    errors: ErrorMap,
}

impl FormController {
    pub fn new(fields: Vec<FieldSchema>, initial: Option<&Value>) -> Self {
        let mut controller = Self {
            fields,
            scalars: IndexMap::new(),
            repeatables: IndexMap::new(),
            errors: ErrorMap::new(),
        };
        controller.seed(initial.unwrap_or(&Value::Null));
        controller
    }

    fn seed(&mut self, value: &Value) {
        self.scalars.clear();
        self.repeatables.clear();
        self.errors.clear();
        let fields = self.fields.clone();
        for field in &fields {
            let seeded = value.get(&field.name);
            match &field.kind {
                FieldKind::Repeatable(_) => {
                    if let Some(state) = RepeatableState::new(field, seeded) {
                        self.repeatables.insert(field.name.clone(), state);
                    }
                }
                FieldKind::Scalar(kind) => {
                    let initial = seeded
                        .or(field.default.as_ref())
                        .map(|raw| coerce_child_value(field, raw))
                        .unwrap_or_else(|| match kind {
                            ScalarKind::MultiSelect(_) => FieldValue::ScalarList(Vec::new()),
                            other => FieldValue::Scalar(zero_scalar(other)),
                        });
                    self.scalars.insert(field.name.clone(), initial);
                }
            }
        }
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn scalar_value(&self, name: &str) -> Option<&FieldValue> {
        self.scalars.get(name)
    }

    pub fn set_scalar(&mut self, name: &str, value: &Value) -> bool {
        let Some(field) = self.field(name).cloned() else {
            return false;
        };
        if field.is_repeatable() {
            return false;
        }
        self.scalars
            .insert(name.to_string(), coerce_child_value(&field, value));
        true
    }

    pub fn repeatable(&self, name: &str) -> Option<&RepeatableState> {
        self.repeatables.get(name)
    }

    pub fn repeatable_mut(&mut self, name: &str) -> Option<&mut RepeatableState> {
        self.repeatables.get_mut(name)
    }

    pub fn set_value(&mut self, value: &Value) {
        self.seed(value);
    }

    pub fn build_value(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            let value = match self.repeatables.get(&field.name) {
                Some(state) => state.value(),
                None => self
                    .scalars
                    .get(&field.name)
                    .map(FieldValue::to_value)
                    .unwrap_or(Value::Null),
            };
            map.insert(field.name.clone(), value);
        }
        Value::Object(map)
    }

    /// Derive the JSON Schema document used for structural validation of the
    /// serialized value: types, required keys, and list bounds only.
    pub fn validation_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Run the validator over the current value and convert each error's JSON
    /// pointer into the `name[index].name` path grammar. Errors on the root
    /// object land in `global`.
    pub fn validate(&self, validator: &Validator) -> ValidationReport {
        let value = self.build_value();
        let mut errors = ErrorMap::new();
        let mut global = Vec::new();
        for error in validator.iter_errors(&value) {
            let pointer = error.instance_path.to_string();
            let message = error.to_string();
            let path = pointer_to_path(&pointer);
            if path.is_empty() {
                global.push(message);
            } else {
                errors.entry(path).or_default().push(message);
            }
        }
        ValidationReport { errors, global }
    }

    /// Install the flat error map and distribute each repeatable field's slice
    /// into its instance tree.
    pub fn update_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
        for (name, state) in &mut self.repeatables {
            let prefix = format!("{name}[");
            let subset = self
                .errors
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, messages)| (key.clone(), messages.clone()))
                .collect();
            state.update_errors(subset);
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        for state in self.repeatables.values_mut() {
            state.clear_errors();
        }
    }

    pub fn field_error(&self, name: &str) -> Option<&Vec<String>> {
        self.errors.get(name)
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

#[derive(Debug)]
pub struct ValidationReport {
    pub errors: ErrorMap,
    pub global: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.global.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum::<usize>() + self.global.len()
    }
}

fn object_schema(fields: &[FieldSchema]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.clone(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(schema)
}

fn field_schema(field: &FieldSchema) -> Value {
    match &field.kind {
        FieldKind::Scalar(kind) => scalar_schema(kind, field.required),
        FieldKind::Repeatable(repeatable) => repeatable_schema(repeatable, field.required),
    }
}

fn scalar_schema(kind: &ScalarKind, required: bool) -> Value {
    match kind {
        ScalarKind::Text => {
            if required {
                json!({"type": "string", "minLength": 1})
            } else {
                json!({"type": "string"})
            }
        }
        ScalarKind::Number => json!({"type": "number"}),
        ScalarKind::Boolean => json!({"type": "boolean"}),
        ScalarKind::Color => json!({"type": "string", "pattern": "^#[0-9a-fA-F]{6}$"}),
        ScalarKind::Select(options) => json!({"type": "string", "enum": options}),
        ScalarKind::MultiSelect(options) => json!({
            "type": "array",
            "items": {"type": "string", "enum": options}
        }),
    }
}

fn repeatable_schema(repeatable: &RepeatableField, required: bool) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("array"));
    let min = repeatable.effective_min(required);
    if min > 0 {
        schema.insert("minItems".to_string(), json!(min));
    }
    if let Some(max) = repeatable.max {
        schema.insert("maxItems".to_string(), json!(max));
    }
    schema.insert(
        "items".to_string(),
        object_schema(&repeatable.child_fields),
    );
    Value::Object(schema)
}

fn pointer_to_path(pointer: &str) -> String {
    let mut out = String::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        if !out.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            out.push('[');
            out.push_str(&token);
            out.push(']');
        } else {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(&token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_field_document;
    use jsonschema::validator_for;
    use serde_json::json;

    fn block_fields() -> Vec<FieldSchema> {
        parse_field_document(&json!([
            {"name": "heading", "type": "text", "required": true},
            {
                "name": "cards",
                "type": "repeatable",
                "required": true,
                "fields": [
                    {"name": "title", "type": "text", "required": true},
                    {
                        "name": "links",
                        "type": "repeatable",
                        "fields": [{"name": "url", "type": "text", "required": true}]
                    }
                ]
            }
        ]))
        .unwrap()
        .fields
    }

    #[test]
    fn converts_pointers_to_bracket_paths() {
        assert_eq!(pointer_to_path("/cards/2/links/0/url"), "cards[2].links[0].url");
        assert_eq!(pointer_to_path("/heading"), "heading");
        assert_eq!(pointer_to_path("/cards/0"), "cards[0]");
        assert_eq!(pointer_to_path(""), "");
    }

    #[test]
    fn builds_value_in_field_order() {
        let controller = FormController::new(
            block_fields(),
            Some(&json!({"heading": "Hi", "cards": [{"title": "One", "links": []}]})),
        );
        let value = controller.build_value();
        assert_eq!(value["heading"], json!("Hi"));
        assert_eq!(value["cards"][0]["title"], json!("One"));
    }

    #[test]
    fn set_value_round_trips() {
        let mut controller = FormController::new(block_fields(), None);
        let value = controller.build_value();
        controller.set_value(&value);
        assert_eq!(controller.build_value(), value);
    }

    #[test]
    fn validation_reports_bracket_paths() {
        let controller = FormController::new(
            block_fields(),
            Some(&json!({
                "heading": "Hi",
                "cards": [{"title": "One", "links": [{"url": ""}]}]
            })),
        );
        let validator = validator_for(&controller.validation_schema()).unwrap();
        let report = controller.validate(&validator);
        assert!(!report.is_valid());
        assert!(report.errors.contains_key("cards[0].links[0].url"));
    }

    #[test]
    fn validation_passes_for_complete_value() {
        let controller = FormController::new(
            block_fields(),
            Some(&json!({
                "heading": "Hi",
                "cards": [{"title": "One", "links": []}]
            })),
        );
        let validator = validator_for(&controller.validation_schema()).unwrap();
        assert!(controller.validate(&validator).is_valid());
    }

    #[test]
    fn update_errors_distributes_into_instances() {
        let mut controller = FormController::new(
            block_fields(),
            Some(&json!({
                "heading": "",
                "cards": [{"title": "", "links": []}]
            })),
        );
        let mut errors = ErrorMap::new();
        errors.insert("heading".to_string(), vec!["required".to_string()]);
        errors.insert("cards[0].title".to_string(), vec!["required".to_string()]);
        controller.update_errors(errors);

        assert_eq!(
            controller.field_error("heading"),
            Some(&vec!["required".to_string()])
        );
        let cards = controller.repeatable("cards").unwrap();
        assert_eq!(
            cards.field_errors(0, "title"),
            Some(&vec!["required".to_string()])
        );
    }
}
