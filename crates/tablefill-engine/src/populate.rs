//! Population runs: evaluate and render every requested table, isolating failures per table.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tablefill_model::ProjectContext;
use tablefill_spec::TableDefinition;

use crate::engine::{EngineOptions, TableEngine};
use crate::result::EvaluationResult;

/// What a renderer did with one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// No table in the document carries the anchor.
    AnchorNotFound,
}

/// Destination of evaluated tables (normally a document).
pub trait TableRenderer {
    type Error: fmt::Display;

    fn render_table(
        &mut self,
        table: &TableDefinition,
        result: &EvaluationResult,
    ) -> Result<RenderOutcome, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Ok,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub id: String,
    pub alt_text: String,
    pub status: TableStatus,
    pub rows: usize,
    pub columns: usize,
    pub cells: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Machine-readable report of a population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tables: Vec<TableReport>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RunSummary {
    fn count(&self, status: TableStatus) -> usize {
        self.tables.iter().filter(|t| t.status == status).count()
    }

    pub fn ok_count(&self) -> usize {
        self.count(TableStatus::Ok)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(TableStatus::Skipped)
    }

    pub fn error_count(&self) -> usize {
        self.count(TableStatus::Error)
    }

    pub fn table(&self, id: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateOptions {
    pub engine: EngineOptions,
    /// Only populate these table ids (case-insensitive); empty means every table.
    pub only: Vec<String>,
}

enum Attempt {
    Done(EvaluationResult, RenderOutcome),
    Failed(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Evaluate and render `tables` in order. One table failing (error or panic) never stops the
/// others; every attempt ends up in the returned summary.
pub fn populate<R: TableRenderer>(
    tables: &[TableDefinition],
    context: &ProjectContext,
    renderer: &mut R,
    options: &PopulateOptions,
) -> RunSummary {
    let engine = TableEngine::new(context, options.engine.clone());
    let mut summary = RunSummary::default();

    for wanted in &options.only {
        if !tables.iter().any(|t| t.id.eq_ignore_ascii_case(wanted)) {
            summary
                .warnings
                .push(format!("requested table `{wanted}` has no table definition"));
        }
    }

    for table in tables {
        if !options.only.is_empty() && !options.only.iter().any(|id| id.eq_ignore_ascii_case(&table.id)) {
            continue;
        }

        let start = Instant::now();
        let attempt = catch_unwind(AssertUnwindSafe(|| {
            let result = match engine.evaluate(table) {
                Ok(result) => result,
                Err(err) => return Attempt::Failed(format!("evaluation failed: {err}")),
            };
            match renderer.render_table(table, &result) {
                Ok(outcome) => Attempt::Done(result, outcome),
                Err(err) => Attempt::Failed(format!("rendering failed: {err}")),
            }
        }))
        .unwrap_or_else(|payload| Attempt::Failed(format!("panicked: {}", panic_message(payload.as_ref()))));
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut report = TableReport {
            id: table.id.clone(),
            alt_text: table.alt_text.clone(),
            status: TableStatus::Ok,
            rows: 0,
            columns: table.columns.len(),
            cells: 0,
            elapsed_ms,
            message: None,
        };
        match attempt {
            Attempt::Done(result, outcome) => {
                report.rows = result.row_count();
                report.columns = result.column_count();
                report.cells = result.cell_count();
                summary.warnings.extend(result.warnings);
                if outcome == RenderOutcome::AnchorNotFound {
                    let message = format!("no table anchored by `{}` in the document", table.alt_text);
                    log::warn!("table `{}` skipped: {message}", table.id);
                    report.status = TableStatus::Skipped;
                    report.message = Some(message);
                }
            }
            Attempt::Failed(message) => {
                log::warn!("table `{}` failed: {message}", table.id);
                summary.errors.push(format!("table `{}`: {message}", table.id));
                report.status = TableStatus::Error;
                report.message = Some(message);
            }
        }
        summary.tables.push(report);
    }

    log::info!(
        "populated {} table(s): {} ok, {} skipped, {} error(s)",
        summary.tables.len(),
        summary.ok_count(),
        summary.skipped_count(),
        summary.error_count()
    );
    summary
}
