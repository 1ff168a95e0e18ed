use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::domain::{FieldKind, FieldSchema, ScalarKind};
use crate::form::{FieldValue, RepeatableState};

/// Where the editing cursor currently sits inside an instance tree: the
/// remaining (child field, record index) hops down to the active instance,
/// then the index of the active child field of its selected record.
#[derive(Debug, Clone)]
pub struct ActiveCursor<'a> {
    pub hops: &'a [(String, usize)],
    pub child_cursor: usize,
}

pub struct InstanceRender {
    pub lines: Vec<Line<'static>>,
    /// Offset (into `lines`) of the active leaf, used for scroll-into-view.
    pub focus_line: Option<usize>,
}

/// Deterministic render of one repeatable instance: a pure function of
/// (records, collapsed set, selection, errors) plus the cursor. Collapsed
/// items render as a single summary line; expanded items list child fields
/// with nested instances indented below them.
pub fn instance_lines(
    state: &RepeatableState,
    indent: usize,
    width: u16,
    active: Option<&ActiveCursor<'_>>,
) -> InstanceRender {
    let pad = "  ".repeat(indent);
    let mut lines = Vec::new();
    let mut focus_line = None;
    let here = active.filter(|cursor| cursor.hops.is_empty());

    if state.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{pad}(empty • Ctrl+N adds the first {})", state.schema().item_label()),
            Style::default().fg(Color::DarkGray),
        )));
        return InstanceRender { lines, focus_line };
    }

    for (index, record) in state.records().iter().enumerate() {
        let selected = state.selected_index() == Some(index);
        let collapsed = state.is_item_collapsed(index);
        lines.push(item_header(state, index, selected, collapsed, &pad, here.is_some()));

        if collapsed {
            lines.push(Line::from(Span::styled(
                format!("{pad}    {}", record_summary(state, index)),
                Style::default().fg(Color::Gray),
            )));
            continue;
        }

        for (child_index, child) in state.schema().child_fields.iter().enumerate() {
            let is_cursor = here
                .is_some_and(|cursor| selected && cursor.child_cursor == child_index);
            match &child.kind {
                FieldKind::Repeatable(_) => {
                    match state.nested(index, &child.name) {
                        Some(nested) => {
                            let count = format!("[{}]", nested.len());
                            lines.push(child_label_line(child, &pad, is_cursor, Some(count)));
                            if is_cursor {
                                focus_line = Some(lines.len() - 1);
                            }
                            let nested_active = active.and_then(|cursor| {
                                descend_cursor(cursor, &child.name, index)
                            });
                            let nested_render = instance_lines(
                                nested,
                                indent + 2,
                                width,
                                nested_active.as_ref(),
                            );
                            if let Some(offset) = nested_render.focus_line {
                                focus_line = Some(lines.len() + offset);
                            }
                            lines.extend(nested_render.lines);
                        }
                        None => {
                            // Beyond the nesting bound: inert raw value.
                            let count = match record.get(&child.name) {
                                Some(FieldValue::Records(items)) => items.len(),
                                _ => 0,
                            };
                            lines.push(Line::from(Span::styled(
                                format!("{pad}  {}: array({count}) (nesting limit)", child.display_label()),
                                Style::default().fg(Color::DarkGray),
                            )));
                        }
                    }
                }
                FieldKind::Scalar(_) => {
                    lines.push(scalar_line(child, record.get(&child.name), &pad, is_cursor));
                    if is_cursor {
                        focus_line = Some(lines.len() - 1);
                    }
                }
            }
            if let Some(messages) = state.field_errors(index, &child.name) {
                lines.extend(error_lines(messages, &pad, width));
            }
        }
    }

    InstanceRender { lines, focus_line }
}

fn descend_cursor<'a>(
    cursor: &ActiveCursor<'a>,
    child: &str,
    index: usize,
) -> Option<ActiveCursor<'a>> {
    let (hop_field, hop_index) = cursor.hops.first()?;
    if hop_field == child && *hop_index == index {
        Some(ActiveCursor {
            hops: &cursor.hops[1..],
            child_cursor: cursor.child_cursor,
        })
    } else {
        None
    }
}

fn item_header(
    state: &RepeatableState,
    index: usize,
    selected: bool,
    collapsed: bool,
    pad: &str,
    instance_active: bool,
) -> Line<'static> {
    let marker = if selected && instance_active { "» " } else { "  " };
    let arrow = if collapsed { "▸" } else { "▾" };
    let label = format!("{pad}{marker}{arrow} {} {}", state.schema().item_label(), index + 1);
    let style = if selected && instance_active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    let mut spans = vec![Span::styled(label, style)];
    if state.item_has_errors(index) {
        spans.push(Span::styled(
            "  • invalid",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn child_label_line(
    child: &FieldSchema,
    pad: &str,
    is_cursor: bool,
    suffix: Option<String>,
) -> Line<'static> {
    let mut label = format!("{pad}  {}", child.display_label());
    if child.required {
        label.push_str(" *");
    }
    if let Some(suffix) = suffix {
        label.push(' ');
        label.push_str(&suffix);
    }
    let style = if is_cursor {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Magenta)
    };
    Line::from(Span::styled(label, style))
}

fn scalar_line(
    child: &FieldSchema,
    value: Option<&FieldValue>,
    pad: &str,
    is_cursor: bool,
) -> Line<'static> {
    let mut label = format!("{pad}  {}", child.display_label());
    if child.required {
        label.push_str(" *");
    }
    let label_style = if is_cursor {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let value_style = if is_cursor {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(": ", Style::default().fg(Color::DarkGray)),
        Span::styled(display_value(child, value), value_style),
    ])
}

fn error_lines(messages: &[String], pad: &str, width: u16) -> Vec<Line<'static>> {
    let clamp = (width as usize).saturating_sub(pad.len() + 6).max(8);
    let mut lines = Vec::new();
    for message in messages {
        for segment in wrap(message, clamp) {
            lines.push(Line::from(Span::styled(
                format!("{pad}    ⚠ {}", segment.into_owned()),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn record_summary(state: &RepeatableState, index: usize) -> String {
    let record = &state.records()[index];
    for child in &state.schema().child_fields {
        if let FieldKind::Scalar(ScalarKind::Text) = &child.kind
            && let Some(FieldValue::Scalar(serde_json::Value::String(text))) =
                record.get(&child.name)
            && !text.is_empty()
        {
            return truncate(text, 40);
        }
    }
    format!("{} field(s)", state.schema().child_fields.len())
}

fn display_value(child: &FieldSchema, value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Scalar(serde_json::Value::String(text))) => {
            if text.is_empty() {
                "~".to_string()
            } else {
                truncate(text, 60)
            }
        }
        Some(FieldValue::Scalar(other)) => other.to_string(),
        Some(FieldValue::ScalarList(items)) => {
            let joined = items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{joined}]")
        }
        Some(FieldValue::Records(items)) => format!("array({})", items.len()),
        None => match &child.kind {
            FieldKind::Scalar(_) => "~".to_string(),
            FieldKind::Repeatable(_) => "array(0)".to_string(),
        },
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthStr::width(ch.to_string().as_str());
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_field_document;
    use crate::form::ErrorMap;
    use serde_json::json;

    fn cards_state() -> RepeatableState {
        let field = parse_field_document(&json!([{
            "name": "cards",
            "type": "repeatable",
            "required": true,
            "itemLabel": "Card",
            "fields": [
                {"name": "title", "type": "text", "required": true},
                {
                    "name": "links",
                    "type": "repeatable",
                    "fields": [{"name": "url", "type": "text"}]
                }
            ]
        }]))
        .unwrap()
        .fields
        .remove(0);
        RepeatableState::new(
            &field,
            Some(&json!([
                {"title": "Alpha", "links": [{"url": "https://a"}]},
                {"title": "Beta", "links": []}
            ])),
        )
        .unwrap()
    }

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn collapsed_items_render_a_single_summary_line() {
        let mut state = cards_state();
        state.toggle_collapse(0);
        let render = instance_lines(&state, 0, 80, None);
        let text = plain(&render.lines);
        assert!(text[0].contains("▸ Card 1"));
        assert!(text[1].contains("Alpha"), "summary shows first text value");
        assert!(text.iter().any(|line| line.contains("▾ Card 2")));
    }

    #[test]
    fn expanded_items_render_nested_instances_indented() {
        let state = cards_state();
        let render = instance_lines(&state, 0, 80, None);
        let text = plain(&render.lines);
        assert!(text.iter().any(|line| line.contains("title") && line.contains("Alpha")));
        assert!(text.iter().any(|line| line.contains("links [1]")));
        assert!(text.iter().any(|line| line.contains("https://a")));
    }

    #[test]
    fn error_decoration_renders_under_the_owning_field() {
        let mut state = cards_state();
        let mut errors = ErrorMap::new();
        errors.insert("cards[1].title".to_string(), vec!["must not be empty".to_string()]);
        state.update_errors(errors);
        let render = instance_lines(&state, 0, 80, None);
        let text = plain(&render.lines);
        let header = text.iter().position(|line| line.contains("Card 2")).unwrap();
        assert!(text[header].contains("invalid"));
        assert!(
            text.iter().skip(header).any(|line| line.contains("⚠") && line.contains("must not be empty"))
        );
    }

    #[test]
    fn cursor_hops_mark_the_focus_line() {
        let state = cards_state();
        let hops = vec![("links".to_string(), 0)];
        let cursor = ActiveCursor {
            hops: &hops,
            child_cursor: 0,
        };
        let render = instance_lines(&state, 0, 80, Some(&cursor));
        let focus = render.focus_line.expect("cursor resolves to a line");
        let text = plain(&render.lines);
        assert!(text[focus].contains("url"));
    }
}
