use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tablefill_model::{CompositeKey, KeyedRecord, ProjectContext, Snapshot};
use tablefill_spec::{Mode, TableDefinition};

use crate::error::EvalError;
use crate::result::{EvaluationResult, SourceObject};
use crate::rows::{merge_diff_row, render_row};
use crate::sort::sort_result;
use crate::styles::{resolve_styles, DiffHighlight};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Per-table cap on logged filter pass/fail samples; `0` disables sampling.
    pub filter_sample_log: usize,
    /// Overrides every table's `DiffMarker`.
    pub diff_marker: Option<String>,
}

/// Evaluates table definitions against one dataset.
pub struct TableEngine<'a> {
    context: &'a ProjectContext,
    options: EngineOptions,
}

impl<'a> TableEngine<'a> {
    pub fn new(context: &'a ProjectContext, options: EngineOptions) -> Self {
        Self { context, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn evaluate(&self, table: &TableDefinition) -> Result<EvaluationResult, EvalError> {
        let mut result = EvaluationResult {
            table_id: table.id.clone(),
            headers: table.headers(),
            merge_columns: table.merge_columns(),
            merge_break_columns: table.formatting.merge_break_columns.clone(),
            ..EvaluationResult::default()
        };
        let marker = self
            .options
            .diff_marker
            .as_deref()
            .unwrap_or(&table.formatting.diff_marker);

        match table.mode {
            Mode::New => {
                let records = self.select(table, &self.context.new, "current", &mut result)?;
                for keyed in records {
                    result.rows.push(render_row(&table.columns, &keyed.record));
                    result
                        .source_objects
                        .push(SourceObject::current(keyed.key.clone(), keyed.record.clone()));
                }
            }
            Mode::Diff => {
                let old = self.context.old.as_ref().ok_or_else(|| {
                    EvalError::MissingPreviousSnapshot {
                        table: table.id.clone(),
                    }
                })?;
                let new_records = self.select(table, &self.context.new, "current", &mut result)?;
                let old_records = self.select(table, old, "previous", &mut result)?;
                self.diff_rows(table, &new_records, &old_records, marker, &mut result);
            }
        }

        if table.has_conditions() || table.mode == Mode::Diff {
            let diff = (table.mode == Mode::Diff).then_some(DiffHighlight {
                marker,
                fill: &table.formatting.diff_fill,
            });
            resolve_styles(table, &mut result, diff);
        }
        sort_result(&mut result, &table.sort_specs);

        log::debug!(
            "table `{}`: {} row(s) x {} column(s)",
            table.id,
            result.row_count(),
            result.column_count()
        );
        Ok(result)
    }

    /// Records of the table's collection in `snapshot` that pass its filters.
    fn select<'s>(
        &self,
        table: &TableDefinition,
        snapshot: &'s Snapshot,
        side: &str,
        result: &mut EvaluationResult,
    ) -> Result<Vec<&'s KeyedRecord>, EvalError> {
        let name = table.collection_name();
        let Some(records) = snapshot.collection(name) else {
            let warning = format!(
                "table `{}`: no {side} collection named `{name}`; the table will be empty",
                table.id
            );
            log::warn!("{warning}");
            result.warnings.push(warning);
            return Ok(Vec::new());
        };

        if table.filters.is_empty() {
            return Ok(records.iter().collect());
        }

        let mut samples = self.options.filter_sample_log;
        let mut selected = Vec::with_capacity(records.len());
        for keyed in records {
            let pass = table
                .filters
                .evaluate(&keyed.record)
                .map_err(|source| EvalError::Filter {
                    table: table.id.clone(),
                    source,
                })?;
            if samples > 0 {
                samples -= 1;
                log::debug!(
                    "table `{}`: {side} record `{}` {} filters",
                    table.id,
                    keyed.key,
                    if pass { "passed" } else { "failed" }
                );
            }
            if pass {
                selected.push(keyed);
            }
        }
        log::debug!(
            "table `{}`: {} of {} {side} record(s) passed filters",
            table.id,
            selected.len(),
            records.len()
        );
        Ok(selected)
    }

    fn diff_rows(
        &self,
        table: &TableDefinition,
        new: &[&KeyedRecord],
        old: &[&KeyedRecord],
        marker: &str,
        result: &mut EvaluationResult,
    ) {
        let new_by_key = index_by_key(table, "current", new, &mut result.warnings);
        let old_by_key = index_by_key(table, "previous", old, &mut result.warnings);
        let mut seen: HashSet<&CompositeKey> = HashSet::new();
        let blank = vec![String::new(); table.columns.len()];

        // Current-state order first, then entities that only exist in the previous state.
        let keys = new
            .iter()
            .map(|k| &k.key)
            .chain(old.iter().map(|k| &k.key));

        for key in keys {
            if !seen.insert(key) {
                continue;
            }
            let current = new_by_key.get(key).copied();
            let previous = old_by_key.get(key).copied();
            let new_row = current
                .map(|k| render_row(&table.columns, &k.record))
                .unwrap_or_else(|| blank.clone());
            let old_row = previous
                .map(|k| render_row(&table.columns, &k.record))
                .unwrap_or_else(|| blank.clone());

            result.rows.push(merge_diff_row(&new_row, &old_row, marker));
            result.source_objects.push(SourceObject {
                key: Some(key.clone()),
                current: current.map(|k| k.record.clone()),
                previous: previous.map(|k| k.record.clone()),
            });
        }
    }
}

/// Index records by composite key. A repeated key keeps its first record.
fn index_by_key<'r>(
    table: &TableDefinition,
    side: &str,
    records: &[&'r KeyedRecord],
    warnings: &mut Vec<String>,
) -> HashMap<&'r CompositeKey, &'r KeyedRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for &keyed in records {
        match index.entry(&keyed.key) {
            Entry::Vacant(slot) => {
                slot.insert(keyed);
            }
            Entry::Occupied(_) => {
                let warning = format!(
                    "table `{}`: duplicate {side} key `{}`; keeping the first record",
                    table.id, keyed.key
                );
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tablefill_spec::ColumnDefinition;

    #[test]
    fn missing_collection_yields_empty_result_with_warning() {
        let context = ProjectContext::from_json_str(r#"{"New": {"Buses": []}}"#).unwrap();
        let table = TableDefinition::new("Panels", "P", vec![ColumnDefinition::property("Tag", "Tag")]);
        let result = TableEngine::new(&context, EngineOptions::default())
            .evaluate(&table)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.headers, vec!["Tag"]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn diff_without_previous_snapshot_fails() {
        let context = ProjectContext::from_json_str(r#"{"New": {"Buses": []}}"#).unwrap();
        let mut table = TableDefinition::new("Buses", "B", vec![ColumnDefinition::property("Id", "Id")]);
        table.mode = Mode::Diff;
        let err = TableEngine::new(&context, EngineOptions::default())
            .evaluate(&table)
            .unwrap_err();
        assert!(matches!(err, EvalError::MissingPreviousSnapshot { table } if table == "Buses"));
    }

    #[test]
    fn duplicate_diff_keys_keep_first_record() {
        let context = ProjectContext::from_json_str(
            r#"{"New": {"Buses": [{"Id": "B1", "Kv": "13.8"}, {"Id": "B1", "Kv": "4.16"}]},
                "Old": {"Buses": [{"Id": "B1", "Kv": "13.8"}]}}"#,
        )
        .unwrap();
        let mut table = TableDefinition::new(
            "Buses",
            "B",
            vec![
                ColumnDefinition::property("Id", "Id"),
                ColumnDefinition::property("kV", "Kv"),
            ],
        );
        table.mode = Mode::Diff;
        let result = TableEngine::new(&context, EngineOptions::default())
            .evaluate(&table)
            .unwrap();
        assert_eq!(result.rows, vec![vec!["B1".to_string(), "13.8".to_string()]]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("duplicate current key `B1`"), "{:?}", result.warnings);
    }
}
