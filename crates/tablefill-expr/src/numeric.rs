use std::sync::OnceLock;

use regex::Regex;

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?").expect("valid regex")
    })
}

/// Parse the first signed float embedded in `text`.
///
/// Engineering values usually carry units (`"10 kA"`, `"480V"`, `"-3.5e2 A"`), so the
/// number does not have to span the whole string.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let m = leading_number_re().find(text)?;
    m.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}
