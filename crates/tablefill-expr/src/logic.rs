//! Boolean filter logic over 1-based rule indexes (`"(1|2)&!3"`).
//!
//! Unlike column expressions this language reports malformed input: it decides which
//! records appear in a report, so a silently wrong filter is worse than a failed table.

use std::fmt;

use crate::LogicError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Index(usize),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogicOp {
    /// Push the value of rule `index` (0-based).
    Load(usize),
    Not,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StackOp {
    Not,
    And,
    Or,
    LParen(usize),
}

impl StackOp {
    fn precedence(self) -> u8 {
        match self {
            StackOp::Not => 3,
            StackOp::And => 2,
            StackOp::Or => 1,
            StackOp::LParen(_) => 0,
        }
    }

    fn emit(self) -> Option<LogicOp> {
        match self {
            StackOp::Not => Some(LogicOp::Not),
            StackOp::And => Some(LogicOp::And),
            StackOp::Or => Some(LogicOp::Or),
            StackOp::LParen(_) => None,
        }
    }
}

/// A parsed filter-logic expression in postfix form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicExpression {
    source: String,
    program: Vec<LogicOp>,
    max_index: usize,
}

impl LogicExpression {
    pub fn parse(source: &str) -> Result<Self, LogicError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(LogicError::Empty);
        }

        let mut program = Vec::with_capacity(tokens.len());
        let mut ops: Vec<StackOp> = Vec::new();
        let mut expect_operand = true;
        let mut max_index = 0usize;

        for (pos, token) in tokens {
            match token {
                Token::Index(index) => {
                    if !expect_operand {
                        return Err(LogicError::UnexpectedToken { pos });
                    }
                    if index == 0 {
                        return Err(LogicError::ZeroIndex);
                    }
                    max_index = max_index.max(index);
                    program.push(LogicOp::Load(index - 1));
                    expect_operand = false;
                }
                Token::Not => {
                    if !expect_operand {
                        return Err(LogicError::UnexpectedToken { pos });
                    }
                    ops.push(StackOp::Not);
                }
                Token::And | Token::Or => {
                    if expect_operand {
                        return Err(LogicError::UnexpectedToken { pos });
                    }
                    let op = if token == Token::And {
                        StackOp::And
                    } else {
                        StackOp::Or
                    };
                    while let Some(&top) = ops.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        ops.pop();
                        program.extend(top.emit());
                    }
                    ops.push(op);
                    expect_operand = true;
                }
                Token::LParen => {
                    if !expect_operand {
                        return Err(LogicError::UnexpectedToken { pos });
                    }
                    ops.push(StackOp::LParen(pos));
                }
                Token::RParen => {
                    if expect_operand {
                        return Err(LogicError::UnexpectedToken { pos });
                    }
                    loop {
                        match ops.pop() {
                            Some(StackOp::LParen(_)) => break,
                            Some(op) => program.extend(op.emit()),
                            None => return Err(LogicError::MismatchedParenthesis { pos }),
                        }
                    }
                }
            }
        }

        if expect_operand {
            return Err(LogicError::UnexpectedEnd);
        }
        while let Some(op) = ops.pop() {
            match op {
                StackOp::LParen(pos) => return Err(LogicError::MismatchedParenthesis { pos }),
                op => program.extend(op.emit()),
            }
        }

        check_stack(&program)?;
        Ok(Self {
            source: source.to_string(),
            program,
            max_index,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Highest 1-based rule index referenced.
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// Fail unless every referenced index is within `1..=rule_count`.
    pub fn check_range(&self, rule_count: usize) -> Result<(), LogicError> {
        if self.max_index > rule_count {
            return Err(LogicError::IndexOutOfRange {
                index: self.max_index,
                count: rule_count,
            });
        }
        Ok(())
    }

    /// Evaluate with `values[i]` holding the outcome of rule `i + 1`.
    pub fn evaluate(&self, values: &[bool]) -> Result<bool, LogicError> {
        self.check_range(values.len())?;
        let mut stack: Vec<bool> = Vec::with_capacity(self.program.len());
        for op in &self.program {
            match *op {
                LogicOp::Load(idx) => stack.push(values[idx]),
                LogicOp::Not => {
                    let v = stack.pop().ok_or(LogicError::MissingOperand)?;
                    stack.push(!v);
                }
                LogicOp::And | LogicOp::Or => {
                    let r = stack.pop().ok_or(LogicError::MissingOperand)?;
                    let l = stack.pop().ok_or(LogicError::MissingOperand)?;
                    stack.push(if *op == LogicOp::And { l && r } else { l || r });
                }
            }
        }
        match stack.as_slice() {
            [result] => Ok(*result),
            [] => Err(LogicError::MissingOperand),
            rest => Err(LogicError::DanglingOperands(rest.len())),
        }
    }
}

impl fmt::Display for LogicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Check `source` against `rule_count` rules without evaluating it.
pub fn validate(source: &str, rule_count: usize) -> Result<(), LogicError> {
    LogicExpression::parse(source)?.check_range(rule_count)
}

/// Parse and evaluate in one step.
pub fn evaluate(source: &str, values: &[bool]) -> Result<bool, LogicError> {
    LogicExpression::parse(source)?.evaluate(values)
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, LogicError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let start = pos;
        let token = match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'0'..=b'9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let index = source[start..pos]
                    .parse::<usize>()
                    .map_err(|_| LogicError::UnexpectedToken { pos: start })?;
                tokens.push((start, Token::Index(index)));
                continue;
            }
            b'!' => Token::Not,
            b'&' => {
                if bytes.get(pos + 1) == Some(&b'&') {
                    pos += 1;
                }
                Token::And
            }
            b'|' => {
                if bytes.get(pos + 1) == Some(&b'|') {
                    pos += 1;
                }
                Token::Or
            }
            b'(' => Token::LParen,
            b')' => Token::RParen,
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('\u{fffd}');
                return Err(LogicError::UnexpectedChar { ch, pos });
            }
        };
        tokens.push((start, token));
        pos += 1;
    }
    Ok(tokens)
}

fn check_stack(program: &[LogicOp]) -> Result<(), LogicError> {
    let mut depth = 0usize;
    for op in program {
        match op {
            LogicOp::Load(_) => depth += 1,
            LogicOp::Not => {
                if depth == 0 {
                    return Err(LogicError::MissingOperand);
                }
            }
            LogicOp::And | LogicOp::Or => {
                if depth < 2 {
                    return Err(LogicError::MissingOperand);
                }
                depth -= 1;
            }
        }
    }
    match depth {
        1 => Ok(()),
        0 => Err(LogicError::MissingOperand),
        n => Err(LogicError::DanglingOperands(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_binds_tighter_than_and_than_or() {
        assert_eq!(evaluate("!1 & (2 | 3)", &[false, true, false]), Ok(true));
        assert_eq!(evaluate("1&2", &[true, false]), Ok(false));
        assert_eq!(evaluate("1 | 2 & 3", &[true, false, false]), Ok(true));
        assert_eq!(evaluate("!1 | 2", &[true, true]), Ok(true));
        assert_eq!(evaluate("!(1 | 2)", &[false, true]), Ok(false));
        assert_eq!(evaluate("!!1", &[true]), Ok(true));
    }

    #[test]
    fn accepts_doubled_operators() {
        assert_eq!(evaluate("1 && 2 || 3", &[false, false, true]), Ok(true));
    }

    #[test]
    fn validate_reports_structure_errors() {
        assert_eq!(
            validate("(1|2", 2),
            Err(LogicError::MismatchedParenthesis { pos: 0 })
        );
        assert_eq!(
            validate("1|2)", 2),
            Err(LogicError::MismatchedParenthesis { pos: 3 })
        );
        assert_eq!(validate("1 &", 1), Err(LogicError::UnexpectedEnd));
        assert_eq!(validate("1 2", 2), Err(LogicError::UnexpectedToken { pos: 2 }));
        assert_eq!(validate("& 1", 1), Err(LogicError::UnexpectedToken { pos: 0 }));
        assert_eq!(validate("0", 1), Err(LogicError::ZeroIndex));
        assert_eq!(validate("", 1), Err(LogicError::Empty));
        assert_eq!(
            validate("1 + 2", 2),
            Err(LogicError::UnexpectedChar { ch: '+', pos: 2 })
        );
        assert!(validate("(1|2)&3", 3).is_ok());
    }

    #[test]
    fn out_of_range_indexes_fail() {
        assert_eq!(
            validate("1|4", 3),
            Err(LogicError::IndexOutOfRange { index: 4, count: 3 })
        );
        assert_eq!(
            evaluate("2", &[true]),
            Err(LogicError::IndexOutOfRange { index: 2, count: 1 })
        );
    }

    #[test]
    fn parsed_expression_is_reusable() {
        let expr = LogicExpression::parse("1 | !2").unwrap();
        assert_eq!(expr.max_index(), 2);
        assert_eq!(expr.evaluate(&[false, false]), Ok(true));
        assert_eq!(expr.evaluate(&[false, true]), Ok(false));
        assert_eq!(expr.to_string(), "1 | !2");
    }
}
