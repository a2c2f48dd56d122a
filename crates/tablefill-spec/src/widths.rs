/// Resolve column widths (percent of table width).
///
/// Explicit widths are kept; unspecified columns split what is left of 100% evenly.
/// Problems are reported through `warnings`.
pub fn reconcile_widths(declared: &[Option<f64>], warnings: &mut Vec<String>) -> Vec<f64> {
    let mut explicit_sum = 0.0;
    let mut unspecified = 0usize;
    let mut widths: Vec<Option<f64>> = Vec::with_capacity(declared.len());

    for (idx, width) in declared.iter().enumerate() {
        match width {
            Some(w) if w.is_finite() && *w > 0.0 => {
                explicit_sum += w;
                widths.push(Some(*w));
            }
            Some(w) => {
                warnings.push(format!(
                    "column {} has invalid WidthPercent {w}; treating it as unspecified",
                    idx + 1
                ));
                unspecified += 1;
                widths.push(None);
            }
            None => {
                unspecified += 1;
                widths.push(None);
            }
        }
    }

    if explicit_sum > 100.0 {
        warnings.push(format!(
            "column widths sum to {explicit_sum}% which exceeds 100%"
        ));
    }
    let remainder = (100.0 - explicit_sum).max(0.0);
    if unspecified > 0 && remainder <= 0.0 {
        warnings.push(format!(
            "no width left for {unspecified} column(s) without WidthPercent"
        ));
    }
    let share = if unspecified > 0 {
        remainder / unspecified as f64
    } else {
        0.0
    };

    widths.into_iter().map(|w| w.unwrap_or(share)).collect()
}
