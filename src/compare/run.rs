// src/compare/run.rs
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::{
    align, compare_columns, pair_indices, ComparisonReport, CompareError, Notice, OrderedMap,
    PairComparison, PairError, PairFailure, PairOutcome,
};
use crate::load::{source_name, LoadError, TableLoader};
use crate::table::Table;

/// A table source: a path plus an optional sheet selector for workbooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,
    pub sheet: Option<String>,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Base file name, used in pair keys.
    pub fn name(&self) -> String {
        source_name(&self.path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Worker threads; `None` means one per available CPU.
    pub jobs: Option<usize>,
}

/// Compare two loaded tables column by column.
pub fn compare_tables(left: &Table, right: &Table) -> Result<PairComparison, CompareError> {
    let alignment = align(left, right);
    if alignment.pairs.is_empty() {
        return Err(CompareError::NoColumnsToCompare {
            left_columns: alignment.left_columns,
            right_columns: alignment.right_columns,
        });
    }
    let mut notices = Vec::new();

    if alignment.unmatched() > 0 {
        debug!(
            left = left.column_count(),
            right = right.column_count(),
            "column counts differ; comparing shared positions only"
        );
        notices.push(Notice::ColumnCountMismatch {
            left_columns: alignment.left_columns,
            right_columns: alignment.right_columns,
        });
    }
    if left.row_count() != right.row_count() {
        debug!(
            left = left.row_count(),
            right = right.row_count(),
            "row counts differ; comparing shared rows only"
        );
        notices.push(Notice::RowCountMismatch {
            left_rows: left.row_count(),
            right_rows: right.row_count(),
        });
    }

    let mut columns = OrderedMap::new();
    for aligned in &alignment.pairs {
        let result = compare_columns(aligned)?;
        columns.insert_unique(aligned.key(), result);
    }

    Ok(PairComparison {
        left_source: left.name().to_string(),
        right_source: right.name().to_string(),
        notices,
        columns,
    })
}

/// Load every source once, compare every pair, and assemble the report.
///
/// A source that fails to load fails only the pairs that reference it.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub fn run<L>(sources: &[Source], loader: &L, options: &RunOptions) -> ComparisonReport
where
    L: TableLoader + ?Sized,
{
    let start = Instant::now();
    let jobs = options.jobs.unwrap_or_else(num_cpus::get).max(1);

    let work = || {
        let tables: Vec<Result<Table, LoadError>> = sources
            .par_iter()
            .map(|s| {
                let loaded = loader.load(&s.path, s.sheet.as_deref());
                if let Err(e) = &loaded {
                    error!(source = %s.path.display(), error = %e, "failed to load source");
                }
                loaded
            })
            .collect();

        pair_indices(sources.len())
            .into_par_iter()
            .map(|(i, j)| {
                let (left, right) = (&sources[i], &sources[j]);
                let key = format!("{}_vs_{}", left.name(), right.name());
                let outcome = compare_pair(left, &tables[i], right, &tables[j]);
                (key, outcome)
            })
            .collect::<Vec<_>>()
    };

    let outcomes = match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(work),
        Err(e) => {
            warn!("could not build worker pool ({}), using the global pool", e);
            work()
        }
    };

    let mut report = ComparisonReport::default();
    for (key, outcome) in outcomes {
        let key = report.pairs.insert_unique(key, outcome);
        debug!(pair = %key, "recorded pair");
    }

    info!(
        pairs = report.pairs.len(),
        failed = report.failures().count(),
        jobs,
        elapsed = ?start.elapsed(),
        "comparison finished"
    );
    report
}

fn compare_pair(
    left: &Source,
    left_table: &Result<Table, LoadError>,
    right: &Source,
    right_table: &Result<Table, LoadError>,
) -> PairOutcome {
    let failed = |errors: Vec<PairError>| {
        PairOutcome::Failed(PairFailure {
            left_source: left.name(),
            right_source: right.name(),
            errors,
        })
    };

    let (l, r) = match (left_table, right_table) {
        (Ok(l), Ok(r)) => (l, r),
        _ => {
            let errors = [(left, left_table), (right, right_table)]
                .into_iter()
                .filter_map(|(src, t)| {
                    t.as_ref().err().map(|e| PairError::Source {
                        source_name: src.name(),
                        error: e.clone(),
                    })
                })
                .collect();
            return failed(errors);
        }
    };

    match compare_tables(l, r) {
        Ok(mut comparison) => {
            comparison.left_source = left.name();
            comparison.right_source = right.name();
            info!(
                left = %comparison.left_source,
                right = %comparison.right_source,
                columns = comparison.columns.len(),
                identical = comparison.is_identical(),
                "compared pair"
            );
            PairOutcome::Compared(comparison)
        }
        Err(e) => {
            warn!(left = %left.name(), right = %right.name(), error = %e, "pair comparison failed");
            failed(vec![e.into()])
        }
    }
}
