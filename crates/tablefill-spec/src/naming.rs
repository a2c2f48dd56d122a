use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as Json;

fn pascal_case() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("valid regex"))
}

pub fn is_pascal_case(name: &str) -> bool {
    pascal_case().is_match(name)
}

/// Walk the whole JSON tree and report every object key that is not PascalCase, as
/// `"<location>: <key>"` messages in document order.
pub fn pascal_case_violations(root: &Json) -> Vec<String> {
    let mut out = Vec::new();
    walk(root, "$", &mut out);
    out
}

fn walk(value: &Json, location: &str, out: &mut Vec<String>) {
    match value {
        Json::Object(obj) => {
            for (key, child) in obj {
                let child_location = format!("{location}.{key}");
                if !is_pascal_case(key) {
                    out.push(format!(
                        "field name `{key}` at {location} must be PascalCase"
                    ));
                }
                walk(child, &child_location, out);
            }
        }
        Json::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                walk(item, &format!("{location}[{idx}]"), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_pascal_case() {
        assert!(is_pascal_case("Id"));
        assert!(is_pascal_case("WidthPercent"));
        assert!(is_pascal_case("Column2"));
        assert!(!is_pascal_case("widthPercent"));
        assert!(!is_pascal_case("Width_Percent"));
        assert!(!is_pascal_case("2Column"));
        assert!(!is_pascal_case(""));
    }

    #[test]
    fn reports_every_offending_key() {
        let doc = json!({
            "Tables": [
                {"id": "Buses", "Columns": [{"Header": "Bus", "name": "Name"}]}
            ],
            "specVersion": 1
        });
        let violations = pascal_case_violations(&doc);
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("`id` at $.Tables[0]")));
        assert!(violations
            .iter()
            .any(|v| v.contains("`name` at $.Tables[0].Columns[0]")));
        assert!(violations.iter().any(|v| v.contains("`specVersion` at $")));
    }

    #[test]
    fn values_are_not_checked() {
        let doc = json!([{"Id": "x", "Mode": "diff", "Columns": [{"Literal": "lower"}]}]);
        assert!(pascal_case_violations(&doc).is_empty());
    }
}
