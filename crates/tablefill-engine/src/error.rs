use tablefill_expr::LogicError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("table `{table}` is in diff mode but no previous snapshot was supplied")]
    MissingPreviousSnapshot { table: String },
    #[error("table `{table}`: filter logic failed: {source}")]
    Filter {
        table: String,
        #[source]
        source: LogicError,
    },
}
