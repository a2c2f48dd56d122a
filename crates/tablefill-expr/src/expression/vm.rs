use tablefill_model::Value;

use super::program::{CompiledExpression, OpCode};
use crate::numeric::parse_leading_number;
use crate::RenderError;

/// Stack-based evaluator for [`CompiledExpression`] programs.
#[derive(Default)]
pub struct Vm {
    stack: Vec<f64>,
    vars: Vec<f64>,
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(stack: usize) -> Self {
        Self {
            stack: Vec::with_capacity(stack),
            vars: Vec::new(),
        }
    }

    /// Evaluate `program` against `record`.
    ///
    /// Variables that do not resolve, or whose text carries no number, read as `0`.
    /// Division by zero yields `0` instead of an infinity.
    pub fn eval(&mut self, program: &CompiledExpression, record: &Value) -> Result<f64, RenderError> {
        self.stack.clear();
        self.vars.clear();
        self.vars.extend(program.paths.iter().map(|path| {
            path.as_ref()
                .and_then(|p| p.resolve(record))
                .and_then(|v| match v {
                    Value::Number(n) => Some(n),
                    other => parse_leading_number(&other.to_text()),
                })
                .unwrap_or(0.0)
        }));

        for inst in program.instrs() {
            match inst.op() {
                OpCode::PushConst => {
                    let v = program
                        .consts
                        .get(inst.operand() as usize)
                        .copied()
                        .ok_or(RenderError::StackUnderflow)?;
                    self.stack.push(v);
                }
                OpCode::LoadVar => {
                    let v = self.vars.get(inst.operand() as usize).copied().unwrap_or(0.0);
                    self.stack.push(v);
                }
                OpCode::Neg => {
                    let v = self.stack.pop().ok_or(RenderError::StackUnderflow)?;
                    self.stack.push(-v);
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    let right = self.stack.pop().ok_or(RenderError::StackUnderflow)?;
                    let left = self.stack.pop().ok_or(RenderError::StackUnderflow)?;
                    let result = match inst.op() {
                        OpCode::Add => left + right,
                        OpCode::Sub => left - right,
                        OpCode::Mul => left * right,
                        _ if right == 0.0 => 0.0,
                        _ => left / right,
                    };
                    self.stack.push(result);
                }
            }
        }

        let result = self.stack.pop().ok_or(RenderError::StackUnderflow)?;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(RenderError::NonFinite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::compile;
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        Value::from(json!({"A": 2, "B": 3, "Zero": 0, "Fault": "10 kA", "Label": "n/a"}))
    }

    #[test]
    fn evaluates_arithmetic() {
        let program = compile("({A} + {B}) * 2 - {B} / 3", None).unwrap();
        assert_eq!(program.try_render(&record()), Ok(9.0));
    }

    #[test]
    fn division_by_zero_is_zero() {
        let program = compile("{A} / {Zero}", None).unwrap();
        assert_eq!(program.try_render(&record()), Ok(0.0));
    }

    #[test]
    fn unit_suffixed_and_missing_variables() {
        let program = compile("{Fault} * 1000 + {Missing} + {Label}", None).unwrap();
        assert_eq!(program.try_render(&record()), Ok(10_000.0));
    }

    #[test]
    fn overflow_is_non_finite() {
        let program = compile("1e308 * 10", None).unwrap();
        assert_eq!(
            program.try_render(&record()),
            Err(RenderError::NonFinite)
        );
        assert_eq!(program.render(&record()), "");
    }
}
