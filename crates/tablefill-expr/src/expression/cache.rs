use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::compiler::compile;
use super::program::CompiledExpression;
use crate::CompileError;

type CacheKey = (Arc<str>, Option<Arc<str>>);

/// Cache of compiled expressions keyed by `(expression text, number format)`.
///
/// Append-only and safe to share across concurrent population runs. Failed compilations
/// are not cached.
#[derive(Default)]
pub struct ExpressionCache {
    programs: DashMap<CacheKey, Arc<CompiledExpression>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn clear(&self) {
        self.programs.clear();
    }

    pub fn get_or_compile(
        &self,
        source: &str,
        number_format: Option<&str>,
    ) -> Result<Arc<CompiledExpression>, CompileError> {
        let key: CacheKey = (Arc::from(source), number_format.map(Arc::from));
        if let Some(existing) = self.programs.get(&key) {
            return Ok(existing.clone());
        }
        let program = Arc::new(compile(source, number_format)?);
        Ok(self.programs.entry(key).or_insert(program).clone())
    }
}

static EXPRESSIONS: OnceLock<ExpressionCache> = OnceLock::new();

/// The process-wide expression cache.
pub fn expression_cache() -> &'static ExpressionCache {
    EXPRESSIONS.get_or_init(ExpressionCache::new)
}

/// Compile through the process-wide cache.
pub fn compile_cached(
    source: &str,
    number_format: Option<&str>,
) -> Result<Arc<CompiledExpression>, CompileError> {
    expression_cache().get_or_compile(source, number_format)
}

/// Drop every cached program. Intended for test isolation.
pub fn clear_expression_cache() {
    expression_cache().clear();
}
