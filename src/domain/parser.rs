use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use super::schema::{
    DEFAULT_MAX_NESTING_DEPTH, FieldKind, FieldSchema, RepeatableField, ScalarKind,
};

#[derive(Debug, Clone)]
pub struct FieldDocument {
    pub title: Option<String>,
    pub fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    label: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    required: bool,
    default: Option<Value>,
    options: Option<Vec<String>>,
    fields: Option<Vec<Value>>,
    min: Option<usize>,
    max: Option<usize>,
    max_nesting_depth: Option<usize>,
    item_label: Option<String>,
    default_item: Option<Value>,
}

/// Parse an authored field document into the internal schema model.
///
/// Accepts either a bare array of field definitions or an object with a
/// `fields` array and optional `title`. Unknown extra keys are ignored so
/// documents can carry editor metadata.
pub fn parse_field_document(value: &Value) -> Result<FieldDocument> {
    let (title, raw_fields) = match value {
        Value::Array(items) => (None, items.as_slice()),
        Value::Object(map) => {
            let fields = map
                .get("fields")
                .and_then(Value::as_array)
                .context("field document must define a `fields` array")?;
            let title = map.get("title").and_then(Value::as_str).map(str::to_string);
            (title, fields.as_slice())
        }
        other => bail!("field document must be an array or object, found {other}"),
    };

    let fields = parse_fields(raw_fields)?;
    Ok(FieldDocument { title, fields })
}

fn parse_fields(raw: &[Value]) -> Result<Vec<FieldSchema>> {
    let mut fields = Vec::with_capacity(raw.len());
    for definition in raw {
        fields.push(parse_field(definition)?);
    }
    let mut seen = std::collections::HashSet::new();
    for field in &fields {
        if !seen.insert(field.name.as_str()) {
            bail!("duplicate field name '{}'", field.name);
        }
    }
    Ok(fields)
}

fn parse_field(definition: &Value) -> Result<FieldSchema> {
    let raw: RawField = serde_json::from_value(definition.clone())
        .context("field definition must be an object with a string `name`")?;
    let name = raw.name.clone();
    let kind_name = raw.kind.as_deref().unwrap_or("text");

    let kind = match kind_name {
        "text" => FieldKind::Scalar(ScalarKind::Text),
        "number" => FieldKind::Scalar(ScalarKind::Number),
        "boolean" => FieldKind::Scalar(ScalarKind::Boolean),
        "color" => FieldKind::Scalar(ScalarKind::Color),
        "select" => FieldKind::Scalar(ScalarKind::Select(require_options(&raw.options, &name)?)),
        "multiselect" => {
            FieldKind::Scalar(ScalarKind::MultiSelect(require_options(&raw.options, &name)?))
        }
        "repeatable" => FieldKind::Repeatable(Box::new(parse_repeatable(&raw, &name)?)),
        other => bail!("field '{name}' has unknown type '{other}'"),
    };

    Ok(FieldSchema {
        label: raw.label.unwrap_or_else(|| name.clone()),
        description: raw.description,
        kind,
        required: raw.required,
        default: raw.default,
        name,
    })
}

fn require_options(options: &Option<Vec<String>>, name: &str) -> Result<Vec<String>> {
    options
        .clone()
        .with_context(|| format!("select field '{name}' requires an `options` array"))
}

fn parse_repeatable(raw: &RawField, name: &str) -> Result<RepeatableField> {
    let raw_children = raw
        .fields
        .as_ref()
        .with_context(|| format!("repeatable field '{name}' requires a `fields` array"))?;
    let child_fields = parse_fields(raw_children)
        .with_context(|| format!("in child fields of repeatable '{name}'"))?;
    if child_fields.is_empty() {
        bail!("repeatable field '{name}' must declare at least one child field");
    }

    if let (Some(min), Some(max)) = (raw.min, raw.max)
        && min > max
    {
        bail!("repeatable field '{name}' declares min {min} above max {max}");
    }
    if let Some(default_item) = &raw.default_item
        && !default_item.is_object()
    {
        bail!("defaultItem of repeatable field '{name}' must be an object");
    }

    Ok(RepeatableField {
        child_fields,
        min: raw.min,
        max: raw.max,
        max_nesting_depth: raw
            .max_nesting_depth
            .map(|depth| depth.max(1))
            .unwrap_or(DEFAULT_MAX_NESTING_DEPTH),
        item_label: raw.item_label.clone(),
        default_item: raw.default_item.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scalar_kinds() {
        let document = json!([
            {"name": "title", "type": "text", "required": true},
            {"name": "count", "type": "number", "default": 4},
            {"name": "accent", "type": "color"},
            {"name": "layout", "type": "select", "options": ["grid", "list"]}
        ]);
        let parsed = parse_field_document(&document).unwrap();
        assert_eq!(parsed.fields.len(), 4);
        assert!(parsed.fields[0].required);
        assert_eq!(parsed.fields[1].default, Some(json!(4)));
        assert_eq!(
            parsed.fields[3].kind,
            FieldKind::Scalar(ScalarKind::Select(vec![
                "grid".to_string(),
                "list".to_string()
            ]))
        );
    }

    #[test]
    fn parses_nested_repeatable() {
        let document = json!({
            "title": "Cards block",
            "fields": [{
                "name": "cards",
                "type": "repeatable",
                "required": true,
                "max": 8,
                "itemLabel": "Card",
                "fields": [
                    {"name": "title", "type": "text", "required": true},
                    {
                        "name": "links",
                        "type": "repeatable",
                        "fields": [{"name": "url", "type": "text"}]
                    }
                ]
            }]
        });
        let parsed = parse_field_document(&document).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Cards block"));
        let cards = parsed.fields[0].repeatable().expect("repeatable");
        assert_eq!(cards.max, Some(8));
        assert_eq!(cards.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert_eq!(cards.item_label(), "Card");
        let links = cards.child("links").unwrap().repeatable().expect("nested");
        assert_eq!(links.child_fields.len(), 1);
    }

    #[test]
    fn missing_type_defaults_to_text() {
        let parsed = parse_field_document(&json!([{"name": "plain"}])).unwrap();
        assert_eq!(parsed.fields[0].kind, FieldKind::Scalar(ScalarKind::Text));
        assert_eq!(parsed.fields[0].label, "plain");
    }

    #[test]
    fn rejects_unknown_type() {
        let document = json!([{"name": "x", "type": "slider"}]);
        let err = parse_field_document(&document).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let document = json!([
            {"name": "x", "type": "text"},
            {"name": "x", "type": "number"}
        ]);
        assert!(parse_field_document(&document).is_err());
    }

    #[test]
    fn rejects_min_above_max() {
        let document = json!([{
            "name": "cards",
            "type": "repeatable",
            "min": 5,
            "max": 2,
            "fields": [{"name": "title"}]
        }]);
        assert!(parse_field_document(&document).is_err());
    }

    #[test]
    fn rejects_select_without_options() {
        let document = json!([{"name": "layout", "type": "select"}]);
        assert!(parse_field_document(&document).is_err());
    }
}
