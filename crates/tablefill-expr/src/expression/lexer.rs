use crate::placeholders::{split_placeholders, Piece};
use crate::CompileError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    /// Index into the expression's variable table.
    Var(u32),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Tokenize `source`, interning `{Path}` placeholders into `variables` (first occurrence
/// order, exact-text de-duplication).
pub(crate) fn tokenize(
    source: &str,
    variables: &mut Vec<String>,
) -> Result<Vec<(usize, Token)>, CompileError> {
    let mut tokens = Vec::new();
    for piece in split_placeholders(source)? {
        match piece {
            Piece::Placeholder(path, pos) => {
                let idx = match variables.iter().position(|v| v == path) {
                    Some(idx) => idx,
                    None => {
                        variables.push(path.to_string());
                        variables.len() - 1
                    }
                };
                tokens.push((pos, Token::Var(idx as u32)));
            }
            Piece::Text(text, offset) => lex_arithmetic(text, offset, &mut tokens)?,
            Piece::Brace(ch, pos) => return Err(CompileError::UnexpectedChar { ch, pos }),
        }
    }
    Ok(tokens)
}

fn lex_arithmetic(
    text: &str,
    offset: usize,
    out: &mut Vec<(usize, Token)>,
) -> Result<(), CompileError> {
    let bytes = text.as_bytes();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let b = bytes[pos];
        let at = offset + pos;
        let token = match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'0'..=b'9' | b'.' => {
                let len = number_len(&bytes[pos..]);
                let raw = &text[pos..pos + len];
                let n: f64 = raw
                    .parse()
                    .map_err(|_| CompileError::InvalidNumber { pos: at })?;
                out.push((at, Token::Number(n)));
                pos += len;
                continue;
            }
            _ => {
                let ch = text[pos..].chars().next().unwrap_or('\u{FFFD}');
                return Err(CompileError::UnexpectedChar { ch, pos: at });
            }
        };
        out.push((at, token));
        pos += 1;
    }
    Ok(())
}

/// Length of the floating literal at the start of `bytes` (`12`, `1.5`, `.5`, `1e-3`).
fn number_len(bytes: &[u8]) -> usize {
    let mut end = 0usize;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                end += 1;
            }
            b'e' | b'E' if !seen_exp && end > 0 => {
                // Only treat `e` as an exponent when digits follow.
                let mut probe = end + 1;
                if matches!(bytes.get(probe), Some(b'+' | b'-')) {
                    probe += 1;
                }
                if !matches!(bytes.get(probe), Some(b'0'..=b'9')) {
                    break;
                }
                seen_exp = true;
                end = probe;
            }
            _ => break,
        }
    }
    end
}
