//! Numeric format strings for rendered expression results.
//!
//! Two families are understood:
//! - standard formats: a letter plus an optional precision (`F2`, `N0`, `P1`, `E3`, `G`, `D4`);
//! - custom patterns built from `0`, `#`, `.`, `,` and `%`, with literal prefix/suffix text
//!   (quoted with `"`/`'` or escaped with `\`), e.g. `#,##0.0 "kA"`.

/// Pattern used when a column does not declare `NumberFormat`: up to three decimals,
/// trailing zeros trimmed.
pub const DEFAULT_NUMBER_FORMAT: &str = "0.###";

/// Format `value` with `pattern` (or [`DEFAULT_NUMBER_FORMAT`] when `None`/blank).
pub fn format_number(value: f64, pattern: Option<&str>) -> String {
    let pattern = match pattern.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_NUMBER_FORMAT,
    };

    if !value.is_finite() {
        return String::new();
    }

    if let Some(std) = StandardFormat::parse(pattern) {
        return std.format(value);
    }
    format_custom(value, pattern)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StandardKind {
    Fixed,
    Number,
    Percent,
    Exponential { upper: bool },
    General,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StandardFormat {
    kind: StandardKind,
    precision: Option<usize>,
}

impl StandardFormat {
    fn parse(pattern: &str) -> Option<Self> {
        let mut chars = pattern.chars();
        let letter = chars.next()?;
        let rest = chars.as_str();
        if !rest.chars().all(|c| c.is_ascii_digit()) || rest.len() > 2 {
            return None;
        }
        let precision = if rest.is_empty() {
            None
        } else {
            Some(rest.parse().ok()?)
        };
        let kind = match letter {
            'F' | 'f' => StandardKind::Fixed,
            'N' | 'n' => StandardKind::Number,
            'P' | 'p' => StandardKind::Percent,
            'E' => StandardKind::Exponential { upper: true },
            'e' => StandardKind::Exponential { upper: false },
            'G' | 'g' => StandardKind::General,
            'D' | 'd' => StandardKind::Decimal,
            _ => return None,
        };
        Some(Self { kind, precision })
    }

    fn format(self, value: f64) -> String {
        match self.kind {
            StandardKind::Fixed => {
                let digits = self.precision.unwrap_or(2);
                with_sign(value, digits, |v| format!("{v:.digits$}"))
            }
            StandardKind::Number => {
                let digits = self.precision.unwrap_or(2);
                with_sign(value, digits, |v| {
                    let s = format!("{v:.digits$}");
                    let (int_part, frac_part) = split_decimal(&s);
                    let mut out = group_thousands(int_part);
                    if !frac_part.is_empty() {
                        out.push('.');
                        out.push_str(frac_part);
                    }
                    out
                })
            }
            StandardKind::Percent => {
                let digits = self.precision.unwrap_or(2);
                let scaled = value * 100.0;
                let mut s = with_sign(scaled, digits, |v| {
                    let s = format!("{v:.digits$}");
                    let (int_part, frac_part) = split_decimal(&s);
                    let mut out = group_thousands(int_part);
                    if !frac_part.is_empty() {
                        out.push('.');
                        out.push_str(frac_part);
                    }
                    out
                });
                s.push('%');
                s
            }
            StandardKind::Exponential { upper } => {
                let digits = self.precision.unwrap_or(6);
                format_exponential(value, digits, upper)
            }
            StandardKind::General => match self.precision {
                Some(p) if p > 0 => {
                    let rounded = round_significant(value, p);
                    plain(rounded)
                }
                _ => plain(value),
            },
            StandardKind::Decimal => {
                let width = self.precision.unwrap_or(0);
                let rounded = value.round();
                let digits = format!("{:0width$}", rounded.abs() as u64, width = width);
                if rounded < 0.0 {
                    format!("-{digits}")
                } else {
                    digits
                }
            }
        }
    }
}

/// Render `|value|` with `render`, prefixing `-` unless the rounded result is zero.
fn with_sign(value: f64, digits: usize, render: impl Fn(f64) -> String) -> String {
    let abs = value.abs();
    let body = render(abs);
    if value < 0.0 && round_to(abs, digits) != 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

fn plain(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    value.to_string()
}

fn round_significant(value: f64, digits: usize) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits as i32 - 1 - magnitude;
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

fn format_exponential(value: f64, digits: usize, upper: bool) -> String {
    let e_char = if upper { 'E' } else { 'e' };
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    let (mut mantissa, mut exp) = if abs == 0.0 {
        (0.0, 0)
    } else {
        let exp = abs.log10().floor() as i32;
        (abs / 10_f64.powi(exp), exp)
    };
    mantissa = round_to(mantissa, digits);
    if mantissa >= 10.0 {
        mantissa /= 10.0;
        exp += 1;
    }
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!(
        "{sign}{mantissa:.digits$}{e_char}{exp_sign}{:03}",
        exp.abs()
    )
}

#[derive(Debug, Clone, Default)]
struct CustomSpec {
    prefix: String,
    suffix: String,
    min_int: usize,
    int_placeholders: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: bool,
    scale_commas: usize,
    percent: usize,
    has_decimal_point: bool,
}

/// Split a custom pattern into literal prefix, placeholder body and literal suffix.
fn parse_custom(pattern: &str) -> Option<CustomSpec> {
    #[derive(PartialEq)]
    enum Region {
        Prefix,
        Body,
        Suffix,
    }

    let mut spec = CustomSpec::default();
    let mut region = Region::Prefix;
    let mut chars = pattern.chars().peekable();
    let mut seen_decimal = false;
    let mut pending_commas = 0usize;

    while let Some(ch) = chars.next() {
        let literal = match ch {
            '"' | '\'' => {
                let mut lit = String::new();
                for c in chars.by_ref() {
                    if c == ch {
                        break;
                    }
                    lit.push(c);
                }
                Some(lit)
            }
            '\\' => Some(chars.next().map(String::from).unwrap_or_default()),
            '%' => {
                spec.percent += 1;
                Some("%".to_string())
            }
            '0' | '#' | '.' | ',' if region != Region::Suffix => None,
            other => Some(other.to_string()),
        };

        if let Some(lit) = literal {
            if region == Region::Body {
                region = Region::Suffix;
            }
            if pending_commas > 0 {
                spec.scale_commas += pending_commas;
                pending_commas = 0;
            }
            match region {
                Region::Prefix => spec.prefix.push_str(&lit),
                _ => spec.suffix.push_str(&lit),
            }
            continue;
        }

        region = Region::Body;
        match ch {
            '0' | '#' => {
                if pending_commas > 0 {
                    if !seen_decimal {
                        spec.grouping = true;
                    }
                    pending_commas = 0;
                }
                if seen_decimal {
                    spec.max_frac += 1;
                    if ch == '0' {
                        spec.min_frac = spec.max_frac;
                    }
                } else {
                    spec.int_placeholders += 1;
                    if ch == '0' {
                        spec.min_int += 1;
                    }
                }
            }
            '.' => {
                if pending_commas > 0 {
                    spec.scale_commas += pending_commas;
                    pending_commas = 0;
                }
                if seen_decimal {
                    // A second decimal point is literal text in the fraction.
                    region = Region::Suffix;
                    spec.suffix.push('.');
                } else {
                    seen_decimal = true;
                    spec.has_decimal_point = true;
                }
            }
            ',' => pending_commas += 1,
            _ => {}
        }
    }
    spec.scale_commas += pending_commas;

    if spec.int_placeholders == 0 && spec.max_frac == 0 {
        return None;
    }
    Some(spec)
}

fn format_custom(value: f64, pattern: &str) -> String {
    let Some(spec) = parse_custom(pattern) else {
        // No placeholders: the pattern is literal text.
        return pattern.to_string();
    };

    let mut v = value.abs();
    for _ in 0..spec.percent {
        v *= 100.0;
    }
    for _ in 0..spec.scale_commas {
        v /= 1000.0;
    }

    let rounded = round_to(v, spec.max_frac);
    let s = format!("{rounded:.prec$}", prec = spec.max_frac);
    let (int_raw, frac_raw) = split_decimal(&s);

    let mut int_part = int_raw.to_string();
    if spec.min_int == 0 && int_part == "0" {
        int_part.clear();
    }
    while int_part.len() < spec.min_int {
        int_part.insert(0, '0');
    }
    if spec.grouping && !int_part.is_empty() {
        int_part = group_thousands(&int_part);
    }

    let mut frac_part = frac_raw.to_string();
    while frac_part.len() > spec.min_frac && frac_part.ends_with('0') {
        frac_part.pop();
    }

    let mut body = int_part;
    if spec.has_decimal_point && !frac_part.is_empty() {
        body.push('.');
        body.push_str(&frac_part);
    }
    if body.is_empty() {
        body.push('0');
    }

    let negative = value < 0.0 && rounded != 0.0;
    let mut out = String::with_capacity(body.len() + spec.prefix.len() + spec.suffix.len() + 1);
    if negative {
        out.push('-');
    }
    out.push_str(&spec.prefix);
    out.push_str(&body);
    out.push_str(&spec.suffix);
    out
}

fn split_decimal(s: &str) -> (&str, &str) {
    match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        let pos_from_end = len - i;
        out.push(ch);
        if pos_from_end > 1 && pos_from_end % 3 == 1 {
            out.push(',');
        }
    }
    out
}
