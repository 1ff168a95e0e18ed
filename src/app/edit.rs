use serde_json::Value;

use crate::domain::ScalarKind;

/// Apply one typed character to a scalar value, returning the new value.
/// Numbers accept digits and one leading minus; text-like kinds append.
/// Boolean and select kinds do not take character input.
pub(crate) fn apply_char(kind: &ScalarKind, current: &Value, ch: char) -> Option<Value> {
    match kind {
        ScalarKind::Text | ScalarKind::Color => {
            let mut text = current.as_str().unwrap_or_default().to_string();
            text.push(ch);
            Some(Value::String(text))
        }
        ScalarKind::Number => {
            let mut text = number_text(current);
            match ch {
                '0'..='9' => text.push(ch),
                '-' if text.is_empty() => text.push(ch),
                _ => return None,
            }
            Some(parse_number(&text))
        }
        ScalarKind::Boolean | ScalarKind::Select(_) | ScalarKind::MultiSelect(_) => None,
    }
}

pub(crate) fn apply_backspace(kind: &ScalarKind, current: &Value) -> Option<Value> {
    match kind {
        ScalarKind::Text | ScalarKind::Color => {
            let mut text = current.as_str().unwrap_or_default().to_string();
            text.pop()?;
            Some(Value::String(text))
        }
        ScalarKind::Number => {
            let mut text = number_text(current);
            text.pop()?;
            Some(parse_number(&text))
        }
        ScalarKind::Boolean | ScalarKind::Select(_) | ScalarKind::MultiSelect(_) => None,
    }
}

/// Enter on a boolean flips it; on a select it cycles to the next option.
pub(crate) fn apply_toggle(kind: &ScalarKind, current: &Value) -> Option<Value> {
    match kind {
        ScalarKind::Boolean => Some(Value::Bool(!current.as_bool().unwrap_or(false))),
        ScalarKind::Select(options) if !options.is_empty() => {
            let position = current
                .as_str()
                .and_then(|value| options.iter().position(|option| option == value))
                .map(|index| (index + 1) % options.len())
                .unwrap_or(0);
            Some(Value::String(options[position].clone()))
        }
        _ => None,
    }
}

fn number_text(current: &Value) -> String {
    match current {
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

fn parse_number(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(0.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_input_appends_and_backspace_pops() {
        let value = apply_char(&ScalarKind::Text, &json!("ab"), 'c').unwrap();
        assert_eq!(value, json!("abc"));
        assert_eq!(apply_backspace(&ScalarKind::Text, &value), Some(json!("ab")));
        assert_eq!(apply_backspace(&ScalarKind::Text, &json!("")), None);
    }

    #[test]
    fn number_input_builds_digits() {
        let value = apply_char(&ScalarKind::Number, &json!(12), '3').unwrap();
        assert_eq!(value, json!(123));
        assert_eq!(apply_char(&ScalarKind::Number, &json!(12), 'x'), None);
        assert_eq!(apply_backspace(&ScalarKind::Number, &json!(123)), Some(json!(12)));
    }

    #[test]
    fn toggle_flips_booleans_and_cycles_selects() {
        assert_eq!(apply_toggle(&ScalarKind::Boolean, &json!(false)), Some(json!(true)));
        let options = ScalarKind::Select(vec!["grid".to_string(), "list".to_string()]);
        assert_eq!(apply_toggle(&options, &json!("grid")), Some(json!("list")));
        assert_eq!(apply_toggle(&options, &json!("list")), Some(json!("grid")));
    }
}
