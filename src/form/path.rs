use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Flat error map keyed by `name` / `name[index].rest` paths. The key grammar
/// is the identity contract shared by serialization, validation output and
/// routing, so it must stay bit-exact.
pub type ErrorMap = BTreeMap<String, Vec<String>>;

static REPEATABLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)\[(\d+)\]\.(.+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath<'a> {
    /// A plain field key with no list segment.
    Scalar(&'a str),
    /// A `field[index].rest` key; `rest` is itself parseable.
    Repeatable {
        field: &'a str,
        index: usize,
        rest: &'a str,
    },
}

pub fn parse_path(key: &str) -> ParsedPath<'_> {
    if let Some(captures) = REPEATABLE_KEY.captures(key) {
        let field = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let index = captures
            .get(2)
            .and_then(|m| m.as_str().parse::<usize>().ok());
        let rest = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
        if let Some(index) = index {
            return ParsedPath::Repeatable { field, index, rest };
        }
    }
    ParsedPath::Scalar(key)
}

pub fn item_path(field: &str, index: usize) -> String {
    format!("{field}[{index}]")
}

/// Total order used to pick "the first error": scalar keys before repeatable
/// keys, repeatable keys by field name then numeric index, ties by raw string
/// compare. Deterministic regardless of map iteration order.
pub fn order_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ordered: Vec<String> = keys.into_iter().map(Into::into).collect();
    ordered.sort_by(|a, b| compare_keys(a, b));
    ordered
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (parse_path(a), parse_path(b)) {
        (ParsedPath::Scalar(_), ParsedPath::Repeatable { .. }) => Ordering::Less,
        (ParsedPath::Repeatable { .. }, ParsedPath::Scalar(_)) => Ordering::Greater,
        (ParsedPath::Scalar(_), ParsedPath::Scalar(_)) => a.cmp(b),
        (
            ParsedPath::Repeatable {
                field: field_a,
                index: index_a,
                ..
            },
            ParsedPath::Repeatable {
                field: field_b,
                index: index_b,
                ..
            },
        ) => field_a
            .cmp(field_b)
            .then(index_a.cmp(&index_b))
            .then_with(|| a.cmp(b)),
    }
}

/// Filter `errors` down to the keys addressing one list item's subtree.
/// With `relativize` the `field[index].` prefix is stripped, which is the form
/// nested instances receive their subsets in; without it keys keep their
/// original spelling for root-level decoration.
pub fn error_subset(errors: &ErrorMap, field: &str, index: usize, relativize: bool) -> ErrorMap {
    let prefix = format!("{}.", item_path(field, index));
    let mut subset = ErrorMap::new();
    for (key, messages) in errors {
        if let Some(stripped) = key.strip_prefix(&prefix) {
            let kept = if relativize { stripped } else { key.as_str() };
            subset.insert(kept.to_string(), messages.clone());
        }
    }
    subset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(entries: &[(&str, &str)]) -> ErrorMap {
        entries
            .iter()
            .map(|(key, message)| (key.to_string(), vec![message.to_string()]))
            .collect()
    }

    #[test]
    fn parses_nested_repeatable_key() {
        let parsed = parse_path("cards[2].links[0].url");
        assert_eq!(
            parsed,
            ParsedPath::Repeatable {
                field: "cards",
                index: 2,
                rest: "links[0].url"
            }
        );
        let ParsedPath::Repeatable { rest, .. } = parsed else {
            unreachable!()
        };
        assert_eq!(
            parse_path(rest),
            ParsedPath::Repeatable {
                field: "links",
                index: 0,
                rest: "url"
            }
        );
        assert_eq!(parse_path("url"), ParsedPath::Scalar("url"));
    }

    #[test]
    fn malformed_bracket_keys_stay_scalar() {
        assert_eq!(parse_path("cards[x].title"), ParsedPath::Scalar("cards[x].title"));
        assert_eq!(parse_path("cards[1]"), ParsedPath::Scalar("cards[1]"));
    }

    #[test]
    fn orders_scalars_before_repeatables_and_indices_numerically() {
        let ordered = order_keys(["title", "cards[1].title", "cards[0].title"]);
        assert_eq!(ordered, vec!["title", "cards[0].title", "cards[1].title"]);
    }

    #[test]
    fn orders_indices_numerically_not_lexicographically() {
        let ordered = order_keys(["cards[10].title", "cards[2].title"]);
        assert_eq!(ordered, vec!["cards[2].title", "cards[10].title"]);
    }

    #[test]
    fn orders_repeatable_fields_lexicographically() {
        let ordered = order_keys(["links[0].url", "cards[3].title", "banner"]);
        assert_eq!(ordered, vec!["banner", "cards[3].title", "links[0].url"]);
    }

    #[test]
    fn subset_relativizes_for_nested_instances() {
        let all = errors(&[
            ("cards[0].title", "required"),
            ("cards[0].links[1].url", "invalid"),
            ("cards[1].title", "required"),
            ("banner", "required"),
        ]);
        let subset = error_subset(&all, "cards", 0, true);
        assert_eq!(subset.len(), 2);
        assert!(subset.contains_key("title"));
        assert!(subset.contains_key("links[1].url"));

        let kept = error_subset(&all, "cards", 1, false);
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("cards[1].title"));
    }
}
