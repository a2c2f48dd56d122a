use std::sync::Arc;

use tablefill_model::{PropertyPath, Value};

use super::vm::Vm;
use crate::number_format::format_number;
use crate::RenderError;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// Push `consts[operand]`.
    PushConst = 0,
    /// Push the numeric value of variable `operand`.
    LoadVar = 1,
    Neg = 2,
    Add = 3,
    Sub = 4,
    Mul = 5,
    Div = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    op: OpCode,
    operand: u32,
}

impl Instruction {
    #[inline]
    pub fn new(op: OpCode, operand: u32) -> Self {
        Self { op, operand }
    }

    #[inline]
    pub fn op(self) -> OpCode {
        self.op
    }

    #[inline]
    pub fn operand(self) -> u32 {
        self.operand
    }
}

/// A compiled arithmetic expression ready for repeated evaluation.
#[derive(Clone, Debug)]
pub struct CompiledExpression {
    pub(crate) source: Arc<str>,
    pub(crate) number_format: Option<Arc<str>>,
    /// Distinct `{Path}` tokens in first-occurrence order.
    pub(crate) variables: Vec<String>,
    /// Parsed form of `variables`; `None` for paths that can never resolve.
    pub(crate) paths: Vec<Option<PropertyPath>>,
    pub(crate) consts: Vec<f64>,
    pub(crate) instrs: Vec<Instruction>,
    pub(crate) max_stack: usize,
}

impl CompiledExpression {
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn number_format(&self) -> Option<&str> {
        self.number_format.as_deref()
    }

    #[inline]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    #[inline]
    pub fn instrs(&self) -> &[Instruction] {
        &self.instrs
    }

    #[inline]
    pub fn consts(&self) -> &[f64] {
        &self.consts
    }

    /// Evaluate against `record`, surfacing evaluation failures.
    pub fn try_render(&self, record: &Value) -> Result<f64, RenderError> {
        Vm::with_capacity(self.max_stack).eval(self, record)
    }

    /// Evaluate and format against `record`.
    ///
    /// Never fails: any evaluation problem renders as empty text so one bad record cannot
    /// abort a report.
    pub fn render(&self, record: &Value) -> String {
        match self.try_render(record) {
            Ok(value) => format_number(value, self.number_format()),
            Err(_) => String::new(),
        }
    }
}
