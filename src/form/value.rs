use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{FieldKind, FieldSchema, RepeatableField, ScalarKind};

/// Stable identity of one record, assigned at creation and never reused.
/// Collapse flags and nested-instance registrations key off this instead of
/// the positional index, so reorder and removal cannot recycle an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    ScalarList(Vec<Value>),
    /// Raw serialized list for a repeatable child. While a live nested
    /// instance exists for the (record, field) pair it supersedes this copy.
    Records(Vec<Value>),
}

impl FieldValue {
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::ScalarList(items) => Value::Array(items.clone()),
            FieldValue::Records(items) => Value::Array(items.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    values: IndexMap<String, FieldValue>,
}

impl Record {
    /// A new record with one entry per child field: the repeatable's explicit
    /// `default_item` entry wins, then the child's own default, then the
    /// kind-appropriate zero value.
    pub(crate) fn fresh(schema: &RepeatableField, id: RecordId) -> Self {
        let mut values = IndexMap::with_capacity(schema.child_fields.len());
        for child in &schema.child_fields {
            let default = schema
                .default_item
                .as_ref()
                .and_then(|item| item.get(&child.name))
                .or(child.default.as_ref());
            let value = match default {
                Some(value) => coerce_child_value(child, value),
                None => zero_field_value(child),
            };
            values.insert(child.name.clone(), value);
        }
        Self { id, values }
    }

    /// A record seeded from a serialized object; absent keys fall back to the
    /// same defaults a fresh record gets.
    pub(crate) fn seeded(schema: &RepeatableField, id: RecordId, value: &Value) -> Self {
        let mut record = Self::fresh(schema, id);
        if let Value::Object(map) = value {
            for child in &schema.child_fields {
                if let Some(raw) = map.get(&child.name) {
                    record
                        .values
                        .insert(child.name.clone(), coerce_child_value(child, raw));
                }
            }
        }
        record
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub(crate) fn set(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Serialize the record as stored, without nested-instance overrides.
    pub fn to_object(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.values {
            map.insert(name.clone(), value.to_value());
        }
        Value::Object(map)
    }
}

pub fn zero_scalar(kind: &ScalarKind) -> Value {
    match kind {
        ScalarKind::Text | ScalarKind::Color => Value::String(String::new()),
        ScalarKind::Number => Value::Number(0.into()),
        ScalarKind::Boolean => Value::Bool(false),
        ScalarKind::Select(options) => options
            .first()
            .cloned()
            .map(Value::String)
            .unwrap_or_else(|| Value::String(String::new())),
        ScalarKind::MultiSelect(_) => Value::Array(Vec::new()),
    }
}

fn zero_field_value(child: &FieldSchema) -> FieldValue {
    match &child.kind {
        FieldKind::Scalar(ScalarKind::MultiSelect(_)) => FieldValue::ScalarList(Vec::new()),
        FieldKind::Scalar(kind) => FieldValue::Scalar(zero_scalar(kind)),
        FieldKind::Repeatable(_) => FieldValue::Records(Vec::new()),
    }
}

pub(crate) fn coerce_child_value(child: &FieldSchema, raw: &Value) -> FieldValue {
    match &child.kind {
        FieldKind::Repeatable(_) => match raw {
            Value::Array(items) => FieldValue::Records(items.clone()),
            _ => FieldValue::Records(Vec::new()),
        },
        FieldKind::Scalar(ScalarKind::MultiSelect(_)) => match raw {
            Value::Array(items) => FieldValue::ScalarList(items.clone()),
            _ => FieldValue::ScalarList(Vec::new()),
        },
        FieldKind::Scalar(_) => FieldValue::Scalar(raw.clone()),
    }
}
