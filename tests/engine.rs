use repeatui::{
    ErrorMap, FormController, RenderSettle, parse_field_document, route_to_first_error,
};
use serde_json::{Value, json};

struct CountingSettle {
    calls: usize,
}

impl RenderSettle for CountingSettle {
    fn settle(&mut self) {
        self.calls += 1;
    }
}

fn cards_controller(initial: Value) -> FormController {
    let document = parse_field_document(&json!({
        "title": "Cards block",
        "fields": [
            {"name": "heading", "type": "text", "required": true},
            {
                "name": "cards",
                "type": "repeatable",
                "required": true,
                "max": 8,
                "itemLabel": "Card",
                "fields": [
                    {"name": "title", "type": "text", "required": true},
                    {"name": "layout", "type": "select", "options": ["grid", "list"]},
                    {
                        "name": "links",
                        "type": "repeatable",
                        "fields": [
                            {"name": "url", "type": "text", "required": true},
                            {"name": "label", "type": "text"}
                        ]
                    }
                ]
            }
        ]
    }))
    .expect("document parses");
    FormController::new(document.fields, Some(&initial))
}

#[test]
fn serialized_value_survives_a_reload_round_trip() {
    let mut controller = cards_controller(json!({
        "heading": "Featured",
        "cards": [
            {"title": "One", "layout": "grid", "links": [{"url": "https://a", "label": "A"}]},
            {"title": "Two", "layout": "list", "links": []}
        ]
    }));
    let cards = controller.repeatable_mut("cards").expect("cards instance");
    cards.add_item();
    cards.update_field(2, "title", &json!("Three"));
    let value = controller.build_value();

    let reloaded = cards_controller(value.clone());
    assert_eq!(reloaded.build_value(), value);
}

#[test]
fn routing_expands_ancestors_and_reports_the_leaf() {
    let mut controller = cards_controller(json!({
        "heading": "Featured",
        "cards": [{"title": "One", "layout": "grid", "links": [{"url": "", "label": ""}]}]
    }));
    {
        let cards = controller.repeatable_mut("cards").unwrap();
        cards.toggle_collapse(0);
        cards.nested_mut(0, "links").unwrap().toggle_collapse(0);
    }

    let mut errors = ErrorMap::new();
    errors.insert(
        "cards[0].links[0].url".to_string(),
        vec!["invalid".to_string()],
    );
    let mut settle = CountingSettle { calls: 0 };
    let target = route_to_first_error(&mut controller, &errors, &mut settle);

    assert_eq!(target.as_deref(), Some("cards[0].links[0].url"));
    assert_eq!(settle.calls, 2);
    let cards = controller.repeatable("cards").unwrap();
    assert!(!cards.is_item_collapsed(0));
    let links = cards.nested(0, "links").unwrap();
    assert!(!links.is_item_collapsed(0));
    assert_eq!(links.field_errors(0, "url"), Some(&vec!["invalid".to_string()]));
}

#[test]
fn mutation_bounds_are_enforced_silently() {
    let mut controller = cards_controller(json!({
        "heading": "Featured",
        "cards": []
    }));
    let cards = controller.repeatable_mut("cards").unwrap();
    assert_eq!(cards.len(), 1, "required list seeds its effective minimum");
    assert!(!cards.remove_item(0), "cannot drop below the minimum");
    for _ in 0..20 {
        cards.add_item();
    }
    assert_eq!(cards.len(), 8, "max bound caps additions");
}
