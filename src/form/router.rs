use tracing::debug;

use super::controller::FormController;
use super::path::{ErrorMap, ParsedPath, item_path, order_keys, parse_path};
use super::repeatable::RepeatableState;

/// Host hook fired after each expansion of a collapsed ancestor, before the
/// next lookup. Render passes are not synchronously observable, so the host
/// waits here for its own notion of "settled".
pub trait RenderSettle {
    fn settle(&mut self);
}

/// For hosts whose render is synchronously observable.
#[derive(Debug, Default)]
pub struct ImmediateSettle;

impl RenderSettle for ImmediateSettle {
    fn settle(&mut self) {}
}

/// Walk the first error (in deterministic key order) down the instance tree:
/// expand every collapsed ancestor, move each instance's cursor onto the
/// erroring item, re-apply error decorations (expansion re-renders wipe the
/// transient markup), and return the full path of the leaf to focus.
///
/// Any miss along the way aborts the walk silently; inline decoration still
/// stands even when the focus target is unreachable.
pub fn route_to_first_error(
    controller: &mut FormController,
    errors: &ErrorMap,
    settle: &mut dyn RenderSettle,
) -> Option<String> {
    let ordered = order_keys(errors.keys().cloned());
    let first = ordered.first()?;

    let target = match parse_path(first) {
        ParsedPath::Scalar(name) => {
            if controller.has_field(name) {
                Some(name.to_string())
            } else {
                debug!(key = %first, "first error names an unknown field");
                None
            }
        }
        ParsedPath::Repeatable { field, index, rest } => {
            let Some(instance) = controller.repeatable_mut(field) else {
                debug!(key = %first, field, "no repeatable instance for first error");
                return None;
            };
            descend(instance, field, index, rest, settle)
        }
    };

    let target = target?;
    controller.update_errors(errors.clone());
    Some(target)
}

fn descend(
    instance: &mut RepeatableState,
    prefix: &str,
    index: usize,
    rest: &str,
    settle: &mut dyn RenderSettle,
) -> Option<String> {
    if index >= instance.len() {
        debug!(prefix, index, "error index out of current range");
        return None;
    }
    if instance.is_item_collapsed(index) {
        instance.expand_item(index);
        settle.settle();
    }
    instance.select_item(index);
    let here = item_path(prefix, index);

    match parse_path(rest) {
        ParsedPath::Scalar(leaf) => {
            if instance.schema().child(leaf).is_none() {
                debug!(prefix = %here, leaf, "leaf field not in schema");
                return None;
            }
            Some(format!("{here}.{leaf}"))
        }
        ParsedPath::Repeatable {
            field,
            index: child_index,
            rest: child_rest,
        } => match instance.nested_mut(index, field) {
            Some(nested) => {
                let child_prefix = format!("{here}.{field}");
                descend(nested, &child_prefix, child_index, child_rest, settle)
            }
            None => {
                debug!(prefix = %here, field, "no nested instance registered");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_field_document;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSettle {
        calls: usize,
    }

    impl RenderSettle for RecordingSettle {
        fn settle(&mut self) {
            self.calls += 1;
        }
    }

    fn controller() -> FormController {
        let fields = parse_field_document(&json!([
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
        .fields;
        FormController::new(
            fields,
            Some(&json!({
                "heading": "Hi",
                "cards": [{"title": "One", "links": [{"url": ""}]}]
            })),
        )
    }

    fn errors(entries: &[(&str, &str)]) -> ErrorMap {
        entries
            .iter()
            .map(|(key, message)| (key.to_string(), vec![message.to_string()]))
            .collect()
    }

    #[test]
    fn expands_every_collapsed_ancestor_before_focusing() {
        let mut controller = controller();
        let cards = controller.repeatable_mut("cards").unwrap();
        cards.toggle_collapse(0);
        cards.nested_mut(0, "links").unwrap().toggle_collapse(0);

        let map = errors(&[("cards[0].links[0].url", "invalid")]);
        let mut settle = RecordingSettle::default();
        let target = route_to_first_error(&mut controller, &map, &mut settle);

        assert_eq!(target.as_deref(), Some("cards[0].links[0].url"));
        assert_eq!(settle.calls, 2, "one settle per expanded ancestor");
        let cards = controller.repeatable("cards").unwrap();
        assert!(!cards.is_item_collapsed(0));
        assert!(!cards.nested(0, "links").unwrap().is_item_collapsed(0));
        assert_eq!(
            cards.nested(0, "links").unwrap().field_errors(0, "url"),
            Some(&vec!["invalid".to_string()]),
            "decorations must be re-applied after expansion"
        );
    }

    #[test]
    fn scalar_errors_win_over_repeatable_errors() {
        let mut controller = controller();
        let map = errors(&[
            ("cards[0].title", "required"),
            ("heading", "required"),
        ]);
        let mut settle = RecordingSettle::default();
        let target = route_to_first_error(&mut controller, &map, &mut settle);
        assert_eq!(target.as_deref(), Some("heading"));
        assert_eq!(settle.calls, 0);
    }

    #[test]
    fn out_of_range_index_aborts_silently() {
        let mut controller = controller();
        let map = errors(&[("cards[9].title", "required")]);
        let target =
            route_to_first_error(&mut controller, &map, &mut ImmediateSettle);
        assert_eq!(target, None);
    }

    #[test]
    fn unknown_leaf_aborts_silently() {
        let mut controller = controller();
        let map = errors(&[("cards[0].subtitle", "required")]);
        let target =
            route_to_first_error(&mut controller, &map, &mut ImmediateSettle);
        assert_eq!(target, None);
    }

    #[test]
    fn moves_cursors_along_the_path() {
        let mut controller = controller();
        controller.repeatable_mut("cards").unwrap().add_item();
        let map = errors(&[("cards[1].title", "required")]);
        route_to_first_error(&mut controller, &map, &mut ImmediateSettle);
        assert_eq!(
            controller.repeatable("cards").unwrap().selected_index(),
            Some(1)
        );
    }

    #[test]
    fn empty_error_map_routes_nowhere() {
        let mut controller = controller();
        let target =
            route_to_first_error(&mut controller, &ErrorMap::new(), &mut ImmediateSettle);
        assert_eq!(target, None);
    }
}
