use std::collections::BTreeMap;

use tablefill_expr::{split_placeholders, Piece};

/// `PropertyMappings`: alias → property path, matched case-insensitively on the whole path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMappings {
    by_alias: BTreeMap<String, String>,
}

impl PropertyMappings {
    pub fn new(entries: &BTreeMap<String, String>) -> Self {
        let by_alias = entries
            .iter()
            .map(|(alias, path)| (alias.trim().to_lowercase(), path.trim().to_string()))
            .filter(|(alias, path)| !alias.is_empty() && !path.is_empty())
            .collect();
        Self { by_alias }
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    /// The mapped path for `path` when it is an alias, else `path` itself (trimmed).
    pub fn resolve<'a>(&'a self, path: &'a str) -> &'a str {
        let path = path.trim();
        self.by_alias
            .get(&path.to_lowercase())
            .map(String::as_str)
            .unwrap_or(path)
    }

    /// Rewrite `{Alias}` placeholders inside a format template or expression.
    ///
    /// Text that does not split cleanly is returned unchanged so the compiler reports the
    /// problem against the original text.
    pub fn rewrite_placeholders(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        let Ok(pieces) = split_placeholders(text) else {
            return text.to_string();
        };
        let mut out = String::with_capacity(text.len());
        for piece in pieces {
            match piece {
                Piece::Text(t, _) => out.push_str(t),
                Piece::Brace(ch, _) => {
                    out.push(ch);
                    out.push(ch);
                }
                Piece::Placeholder(path, _) => {
                    out.push('{');
                    out.push_str(self.resolve(path));
                    out.push('}');
                }
            }
        }
        out
    }
}
