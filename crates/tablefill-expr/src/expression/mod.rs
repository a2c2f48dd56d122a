//! Arithmetic column expressions: `{Path}` variables, `+ - * /`, unary signs and parentheses.
//!
//! Source text is compiled once into a [`CompiledExpression`] (a de-duplicated variable table
//! plus an RPN instruction stream) and evaluated per record by a small stack machine.

mod cache;
mod compiler;
mod lexer;
mod program;
mod vm;

pub use cache::{clear_expression_cache, compile_cached, expression_cache, ExpressionCache};
pub use compiler::compile;
pub use program::{CompiledExpression, Instruction, OpCode};
pub use vm::Vm;
