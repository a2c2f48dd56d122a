use thiserror::Error;

/// Failure to compile a column expression or format template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("expression is empty")]
    Empty,
    #[error("unterminated `{{` placeholder at byte {pos}")]
    UnterminatedPlaceholder { pos: usize },
    #[error("empty `{{}}` placeholder at byte {pos}")]
    EmptyPlaceholder { pos: usize },
    #[error("unexpected character `{ch}` at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number at byte {pos}")]
    InvalidNumber { pos: usize },
    #[error("unexpected token at byte {pos}")]
    UnexpectedToken { pos: usize },
    #[error("mismatched parenthesis at byte {pos}")]
    MismatchedParenthesis { pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("operator is missing an operand")]
    MissingOperand,
    #[error("expression leaves {0} values on the stack")]
    DanglingOperands(usize),
}

/// Failure while evaluating a compiled expression against a record.
///
/// Callers rendering cells normally use [`crate::CompiledExpression::render`], which maps
/// these to empty text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("expression produced a non-finite result")]
    NonFinite,
}

/// Malformed or unevaluable boolean filter-logic expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    #[error("filter logic is empty")]
    Empty,
    #[error("unexpected character `{ch}` at byte {pos} in filter logic")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected token at byte {pos} in filter logic")]
    UnexpectedToken { pos: usize },
    #[error("mismatched parenthesis at byte {pos} in filter logic")]
    MismatchedParenthesis { pos: usize },
    #[error("filter logic ends with an operator")]
    UnexpectedEnd,
    #[error("rule index 0 is invalid (rule indexes are 1-based)")]
    ZeroIndex,
    #[error("rule index {index} is out of range ({count} rules defined)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("operator is missing an operand")]
    MissingOperand,
    #[error("filter logic leaves {0} values unconsumed")]
    DanglingOperands(usize),
}
