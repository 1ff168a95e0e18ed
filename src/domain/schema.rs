use serde_json::Value;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    Text,
    Number,
    Boolean,
    Color,
    Select(Vec<String>),
    MultiSelect(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatableField {
    pub child_fields: Vec<FieldSchema>,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub max_nesting_depth: usize,
    pub item_label: Option<String>,
    pub default_item: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Repeatable(Box<RepeatableField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldSchema {
    pub fn display_label(&self) -> String {
        if self.label.eq_ignore_ascii_case(&self.name) {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, self.name)
        }
    }

    pub fn is_repeatable(&self) -> bool {
        matches!(self.kind, FieldKind::Repeatable(_))
    }

    pub fn repeatable(&self) -> Option<&RepeatableField> {
        match &self.kind {
            FieldKind::Repeatable(field) => Some(field),
            FieldKind::Scalar(_) => None,
        }
    }
}

impl RepeatableField {
    /// Lower bound enforced on the list length. The configured `min` only
    /// applies while the field is required; an optional list must always be
    /// clearable down to empty.
    pub fn effective_min(&self, required: bool) -> usize {
        if required { self.min.unwrap_or(1) } else { 0 }
    }

    pub fn child(&self, name: &str) -> Option<&FieldSchema> {
        self.child_fields.iter().find(|field| field.name == name)
    }

    pub fn item_label(&self) -> &str {
        self.item_label.as_deref().unwrap_or("Item")
    }
}
