use crate::CompileError;

/// A slice of template/expression text: either literal text or a `{Path}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    /// Literal text and its byte offset in the source.
    Text(&'a str, usize),
    /// Trimmed placeholder path and the byte offset of its `{`.
    Placeholder(&'a str, usize),
    /// An escaped brace (`{{` or `}}`), rendered as the single character.
    Brace(char, usize),
}

/// Split `text` into literal runs and `{Path}` placeholders.
///
/// `{{` and `}}` escape a literal brace. An unterminated `{` or an empty `{}` is an error.
pub fn split_placeholders(text: &str) -> Result<Vec<Piece<'_>>, CompileError> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut literal_start = 0usize;
    let mut pos = 0usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' | b'}' if bytes.get(pos + 1) == Some(&bytes[pos]) => {
                if literal_start < pos {
                    pieces.push(Piece::Text(&text[literal_start..pos], literal_start));
                }
                pieces.push(Piece::Brace(bytes[pos] as char, pos));
                pos += 2;
                literal_start = pos;
            }
            b'{' => {
                if literal_start < pos {
                    pieces.push(Piece::Text(&text[literal_start..pos], literal_start));
                }
                let close = text[pos + 1..]
                    .find('}')
                    .map(|off| pos + 1 + off)
                    .ok_or(CompileError::UnterminatedPlaceholder { pos })?;
                let path = text[pos + 1..close].trim();
                if path.is_empty() || path.contains('{') {
                    return Err(CompileError::EmptyPlaceholder { pos });
                }
                pieces.push(Piece::Placeholder(path, pos));
                pos = close + 1;
                literal_start = pos;
            }
            _ => pos += 1,
        }
    }
    if literal_start < bytes.len() {
        pieces.push(Piece::Text(&text[literal_start..], literal_start));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_and_placeholders() {
        let pieces = split_placeholders("{ A.B } kA / {C[0]}").unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece::Placeholder("A.B", 0),
                Piece::Text(" kA / ", 7),
                Piece::Placeholder("C[0]", 13),
            ]
        );
    }

    #[test]
    fn doubled_braces_escape() {
        let pieces = split_placeholders("{{x}}").unwrap();
        assert_eq!(
            pieces,
            vec![
                Piece::Brace('{', 0),
                Piece::Text("x", 2),
                Piece::Brace('}', 3),
            ]
        );
    }

    #[test]
    fn rejects_unterminated_and_empty() {
        assert_eq!(
            split_placeholders("{A").unwrap_err(),
            CompileError::UnterminatedPlaceholder { pos: 0 }
        );
        assert_eq!(
            split_placeholders("x { }").unwrap_err(),
            CompileError::EmptyPlaceholder { pos: 2 }
        );
    }
}
