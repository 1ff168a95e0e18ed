use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{FieldSchema, RepeatableField};

use super::path::{ErrorMap, error_subset, item_path};
use super::value::{FieldValue, Record, RecordId, coerce_child_value};

/// One live repeatable list: the ordered records, their collapse state, and
/// one nested instance per (record, repeatable child field) pair while the
/// nesting depth allows it.
///
/// Mutations are silent no-ops when they would violate the schema bounds or
/// address an index out of range; the list must never become unrenderable
/// from a bad call.
#[derive(Debug, Clone)]
pub struct RepeatableState {
    name: String,
    schema: RepeatableField,
    required: bool,
    depth: usize,
    records: Vec<Record>,
    collapsed: HashSet<RecordId>,
    nested: HashMap<(RecordId, String), RepeatableState>,
    errors: ErrorMap,
    selected: usize,
    next_id: u64,
}

impl RepeatableState {
    pub fn new(field: &FieldSchema, initial: Option<&Value>) -> Option<Self> {
        let schema = field.repeatable()?.clone();
        // The root list is nesting level 1, so a max_nesting_depth of 2 allows
        // exactly one repeatable level below it.
        Some(Self::from_parts(
            field.name.clone(),
            schema,
            field.required,
            initial,
            1,
        ))
    }

    pub(crate) fn from_parts(
        name: String,
        schema: RepeatableField,
        required: bool,
        initial: Option<&Value>,
        depth: usize,
    ) -> Self {
        let mut state = Self {
            name,
            schema,
            required,
            depth,
            records: Vec::new(),
            collapsed: HashSet::new(),
            nested: HashMap::new(),
            errors: ErrorMap::new(),
            selected: 0,
            next_id: 0,
        };
        state.seed(initial.unwrap_or(&Value::Null));
        state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &RepeatableField {
        &self.schema
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn effective_min(&self) -> usize {
        self.schema.effective_min(self.required)
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.selected.min(self.records.len() - 1))
        }
    }

    pub fn select_item(&mut self, index: usize) {
        if !self.records.is_empty() {
            self.selected = index.min(self.records.len() - 1);
        }
    }

    pub fn select(&mut self, delta: i32) -> bool {
        if self.records.is_empty() {
            return false;
        }
        let len = self.records.len() as i32;
        let next = (self.selected as i32 + delta).clamp(0, len - 1);
        let changed = next as usize != self.selected;
        self.selected = next as usize;
        changed
    }

    /// Replace the whole list from a serialized value, then top the list up to
    /// the effective minimum with fresh records.
    pub fn set_value(&mut self, value: &Value) {
        self.seed(value);
    }

    fn seed(&mut self, value: &Value) {
        self.records.clear();
        self.collapsed.clear();
        self.nested.clear();
        self.selected = 0;
        if let Value::Array(items) = value {
            for item in items {
                let id = self.alloc_id();
                let record = Record::seeded(&self.schema, id, item);
                self.attach_nested(&record);
                self.records.push(record);
            }
        }
        while self.records.len() < self.effective_min() {
            let id = self.alloc_id();
            let record = Record::fresh(&self.schema, id);
            self.attach_nested(&record);
            self.records.push(record);
        }
    }

    pub fn add_item(&mut self) -> bool {
        if let Some(max) = self.schema.max
            && self.records.len() >= max
        {
            debug!(field = %self.name, max, "add_item capped at max");
            return false;
        }
        let id = self.alloc_id();
        let record = Record::fresh(&self.schema, id);
        self.attach_nested(&record);
        self.records.push(record);
        self.selected = self.records.len() - 1;
        true
    }

    pub fn remove_item(&mut self, index: usize) -> bool {
        if index >= self.records.len() {
            debug!(field = %self.name, index, "remove_item index out of range");
            return false;
        }
        if self.records.len() <= self.effective_min() {
            debug!(field = %self.name, "remove_item at effective minimum");
            return false;
        }
        let record = self.records.remove(index);
        self.collapsed.remove(&record.id());
        self.nested.retain(|(id, _), _| *id != record.id());
        if self.selected >= self.records.len() {
            self.selected = self.records.len().saturating_sub(1);
        }
        true
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.records.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let record = self.records.remove(from);
        self.records.insert(to, record);
        self.selected = to;
        true
    }

    pub fn is_item_collapsed(&self, index: usize) -> bool {
        self.records
            .get(index)
            .is_some_and(|record| self.collapsed.contains(&record.id()))
    }

    pub fn toggle_collapse(&mut self, index: usize) -> bool {
        let Some(record) = self.records.get(index) else {
            return false;
        };
        let id = record.id();
        if !self.collapsed.remove(&id) {
            self.collapsed.insert(id);
        }
        true
    }

    /// Idempotent: expanding an already-expanded item changes nothing.
    pub fn expand_item(&mut self, index: usize) -> bool {
        match self.records.get(index) {
            Some(record) => self.collapsed.remove(&record.id()),
            None => false,
        }
    }

    /// Write a scalar or scalar-list leaf. Repeatable children are composed
    /// through their nested instance, never written directly.
    pub fn update_field(&mut self, index: usize, name: &str, value: &Value) -> bool {
        let Some(child) = self.schema.child(name).cloned() else {
            debug!(field = %self.name, child = name, "update_field unknown child");
            return false;
        };
        if child.is_repeatable() {
            debug!(field = %self.name, child = name, "update_field on repeatable child ignored");
            return false;
        }
        let Some(record) = self.records.get_mut(index) else {
            debug!(field = %self.name, index, "update_field index out of range");
            return false;
        };
        record.set(name, coerce_child_value(&child, value));
        true
    }

    pub fn nested(&self, index: usize, name: &str) -> Option<&RepeatableState> {
        let id = self.records.get(index)?.id();
        self.nested.get(&(id, name.to_string()))
    }

    pub fn nested_mut(&mut self, index: usize, name: &str) -> Option<&mut RepeatableState> {
        let id = self.records.get(index)?.id();
        self.nested.get_mut(&(id, name.to_string()))
    }

    /// Serialized list value. Live nested instances supersede the raw record
    /// copies, so nested edits are always reflected.
    pub fn value(&self) -> Value {
        let items = self
            .records
            .iter()
            .map(|record| self.record_value(record))
            .collect();
        Value::Array(items)
    }

    fn record_value(&self, record: &Record) -> Value {
        let mut map = Map::new();
        for child in &self.schema.child_fields {
            let key = (record.id(), child.name.clone());
            let value = match self.nested.get(&key) {
                Some(instance) => instance.value(),
                None => record
                    .get(&child.name)
                    .map(FieldValue::to_value)
                    .unwrap_or(Value::Null),
            };
            map.insert(child.name.clone(), value);
        }
        Value::Object(map)
    }

    /// Install a new relativized error subset and push the matching slices
    /// into every live nested instance.
    pub fn update_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
        let name = self.name.clone();
        let positions: HashMap<RecordId, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.id(), index))
            .collect();
        for ((id, child), instance) in &mut self.nested {
            let Some(&index) = positions.get(id) else {
                continue;
            };
            let scoped = error_subset(&self.errors, &name, index, true);
            let prefix = format!("{child}[");
            let nested_errors = scoped
                .into_iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .collect();
            instance.update_errors(nested_errors);
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        for instance in self.nested.values_mut() {
            instance.clear_errors();
        }
    }

    pub fn field_errors(&self, index: usize, name: &str) -> Option<&Vec<String>> {
        let key = format!("{}.{}", item_path(&self.name, index), name);
        self.errors.get(&key)
    }

    pub fn item_has_errors(&self, index: usize) -> bool {
        let prefix = format!("{}.", item_path(&self.name, index));
        self.errors.keys().any(|key| key.starts_with(&prefix))
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    fn alloc_id(&mut self) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn attach_nested(&mut self, record: &Record) {
        for child in &self.schema.child_fields {
            let Some(child_schema) = child.repeatable() else {
                continue;
            };
            if self.depth >= child_schema.max_nesting_depth {
                continue;
            }
            let initial = record.get(&child.name).map(FieldValue::to_value);
            let instance = RepeatableState::from_parts(
                child.name.clone(),
                child_schema.clone(),
                child.required,
                initial.as_ref(),
                self.depth + 1,
            );
            self.nested.insert((record.id(), child.name.clone()), instance);
        }
    }
}
