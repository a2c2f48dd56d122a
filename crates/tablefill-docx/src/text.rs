//! Cell text clean-up applied just before rendering.

use std::collections::HashSet;

/// Remove repeated lines from newline-joined cell text, keeping the first occurrence.
///
/// The loose form compares lines case-insensitively with whitespace runs collapsed; `strict`
/// only folds lines that are identical once trimmed. Blank lines are never removed.
pub fn remove_duplicate_lines(text: &str, strict: bool) -> String {
    let mut seen = HashSet::new();
    let mut kept: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            kept.push(line);
            continue;
        }
        let key = if strict {
            line.trim().to_string()
        } else {
            line.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        };
        if seen.insert(key) {
            kept.push(line);
        }
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_dedup_ignores_case_and_spacing() {
        assert_eq!(
            remove_duplicate_lines("CB-1 Open\ncb-1   open\nCB-2", false),
            "CB-1 Open\nCB-2"
        );
    }

    #[test]
    fn strict_dedup_only_folds_identical_lines() {
        assert_eq!(
            remove_duplicate_lines("CB-1\n CB-1 \ncb-1", true),
            "CB-1\ncb-1"
        );
    }

    #[test]
    fn keeps_blank_lines_and_single_lines() {
        assert_eq!(remove_duplicate_lines("A\n\nA\n\nB", false), "A\n\n\nB");
        assert_eq!(remove_duplicate_lines("only", false), "only");
        assert_eq!(remove_duplicate_lines("", true), "");
    }
}
