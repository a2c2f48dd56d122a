use std::sync::Arc;

use tablefill_model::PropertyPath;

use super::lexer::{tokenize, Token};
use super::program::{CompiledExpression, Instruction, OpCode};
use crate::CompileError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StackOp {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    /// Unary plus; emits nothing.
    Pos,
    LParen(usize),
}

impl StackOp {
    fn precedence(self) -> u8 {
        match self {
            StackOp::Add | StackOp::Sub => 1,
            StackOp::Mul | StackOp::Div => 2,
            StackOp::Neg | StackOp::Pos => 3,
            StackOp::LParen(_) => 0,
        }
    }

    fn opcode(self) -> Option<OpCode> {
        match self {
            StackOp::Add => Some(OpCode::Add),
            StackOp::Sub => Some(OpCode::Sub),
            StackOp::Mul => Some(OpCode::Mul),
            StackOp::Div => Some(OpCode::Div),
            StackOp::Neg => Some(OpCode::Neg),
            StackOp::Pos | StackOp::LParen(_) => None,
        }
    }
}

/// Compile `source` into RPN using a shunting-yard pass.
///
/// `*`/`/` bind tighter than `+`/`-`, unary signs bind tightest, and all binary operators
/// are left-associative.
pub fn compile(source: &str, number_format: Option<&str>) -> Result<CompiledExpression, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::Empty);
    }

    let mut variables = Vec::new();
    let tokens = tokenize(source, &mut variables)?;

    let mut consts: Vec<f64> = Vec::new();
    let mut instrs: Vec<Instruction> = Vec::with_capacity(tokens.len());
    let mut ops: Vec<StackOp> = Vec::new();
    let mut expect_operand = true;

    for (pos, token) in tokens {
        match token {
            Token::Number(n) => {
                if !expect_operand {
                    return Err(CompileError::UnexpectedToken { pos });
                }
                let idx = consts.len() as u32;
                consts.push(n);
                instrs.push(Instruction::new(OpCode::PushConst, idx));
                expect_operand = false;
            }
            Token::Var(idx) => {
                if !expect_operand {
                    return Err(CompileError::UnexpectedToken { pos });
                }
                instrs.push(Instruction::new(OpCode::LoadVar, idx));
                expect_operand = false;
            }
            Token::Plus | Token::Minus if expect_operand => {
                ops.push(if token == Token::Minus {
                    StackOp::Neg
                } else {
                    StackOp::Pos
                });
            }
            Token::Plus | Token::Minus | Token::Star | Token::Slash => {
                if expect_operand {
                    return Err(CompileError::UnexpectedToken { pos });
                }
                let op = match token {
                    Token::Plus => StackOp::Add,
                    Token::Minus => StackOp::Sub,
                    Token::Star => StackOp::Mul,
                    _ => StackOp::Div,
                };
                while let Some(&top) = ops.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    ops.pop();
                    if let Some(code) = top.opcode() {
                        instrs.push(Instruction::new(code, 0));
                    }
                }
                ops.push(op);
                expect_operand = true;
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(CompileError::UnexpectedToken { pos });
                }
                ops.push(StackOp::LParen(pos));
            }
            Token::RParen => {
                if expect_operand {
                    return Err(CompileError::UnexpectedToken { pos });
                }
                loop {
                    match ops.pop() {
                        Some(StackOp::LParen(_)) => break,
                        Some(top) => {
                            if let Some(code) = top.opcode() {
                                instrs.push(Instruction::new(code, 0));
                            }
                        }
                        None => return Err(CompileError::MismatchedParenthesis { pos }),
                    }
                }
            }
        }
    }

    if expect_operand {
        return Err(CompileError::UnexpectedEnd);
    }
    while let Some(top) = ops.pop() {
        match top {
            StackOp::LParen(pos) => return Err(CompileError::MismatchedParenthesis { pos }),
            other => {
                if let Some(code) = other.opcode() {
                    instrs.push(Instruction::new(code, 0));
                }
            }
        }
    }

    let max_stack = check_stack(&instrs)?;
    let paths = variables.iter().map(|v| PropertyPath::parse(v)).collect();

    Ok(CompiledExpression {
        source: Arc::from(source),
        number_format: number_format
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(Arc::from),
        variables,
        paths,
        consts,
        instrs,
        max_stack,
    })
}

/// Simulate stack depth so operand-count mistakes surface at compile time.
fn check_stack(instrs: &[Instruction]) -> Result<usize, CompileError> {
    let mut depth = 0usize;
    let mut max = 0usize;
    for inst in instrs {
        match inst.op() {
            OpCode::PushConst | OpCode::LoadVar => depth += 1,
            OpCode::Neg => {
                if depth < 1 {
                    return Err(CompileError::MissingOperand);
                }
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                if depth < 2 {
                    return Err(CompileError::MissingOperand);
                }
                depth -= 1;
            }
        }
        max = max.max(depth);
    }
    match depth {
        1 => Ok(max),
        0 => Err(CompileError::MissingOperand),
        n => Err(CompileError::DanglingOperands(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(source: &str) -> Vec<OpCode> {
        compile(source, None)
            .unwrap()
            .instrs()
            .iter()
            .map(|i| i.op())
            .collect()
    }

    #[test]
    fn multiplication_binds_tighter() {
        use OpCode::*;
        assert_eq!(
            ops("1 + 2 * 3"),
            vec![PushConst, PushConst, PushConst, Mul, Add]
        );
        assert_eq!(
            ops("(1 + 2) * 3"),
            vec![PushConst, PushConst, Add, PushConst, Mul]
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        use OpCode::*;
        assert_eq!(
            ops("5 - 2 - 1"),
            vec![PushConst, PushConst, Sub, PushConst, Sub]
        );
    }

    #[test]
    fn unary_signs() {
        use OpCode::*;
        assert_eq!(ops("-{A}"), vec![LoadVar, Neg]);
        assert_eq!(ops("+{A}"), vec![LoadVar]);
        assert_eq!(ops("2 * -3"), vec![PushConst, PushConst, Neg, Mul]);
        assert_eq!(ops("--1"), vec![PushConst, Neg, Neg]);
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(compile("", None).unwrap_err(), CompileError::Empty);
        assert_eq!(compile("1 +", None).unwrap_err(), CompileError::UnexpectedEnd);
        assert_eq!(
            compile("(1 + 2", None).unwrap_err(),
            CompileError::MismatchedParenthesis { pos: 0 }
        );
        assert_eq!(
            compile("1 + 2)", None).unwrap_err(),
            CompileError::MismatchedParenthesis { pos: 5 }
        );
        assert_eq!(
            compile("1 2", None).unwrap_err(),
            CompileError::UnexpectedToken { pos: 2 }
        );
        assert_eq!(
            compile("* 2", None).unwrap_err(),
            CompileError::UnexpectedToken { pos: 0 }
        );
        assert_eq!(
            compile("()", None).unwrap_err(),
            CompileError::UnexpectedToken { pos: 1 }
        );
    }

    #[test]
    fn blank_format_is_dropped() {
        let program = compile("{A}", Some("  ")).unwrap();
        assert_eq!(program.number_format(), None);
        assert_eq!(program.variables(), &["A".to_string()]);
    }
}
