// src/compare/mod.rs
//! Positional comparison of tables.
//!
//! Sources are paired off ([`pairs`]), their columns matched by position
//! ([`align`]), each column pair reduced to an equality mask with statistics and
//! discrepancies ([`column`]), and everything collected into a
//! [`ComparisonReport`] ([`report`], [`run`]).

pub mod align;
pub mod column;
pub mod pairs;
pub mod report;
pub mod run;

pub use align::{align, AlignedColumns, ColumnAlignment};
pub use column::{compare_columns, record_discrepancies, ColumnComparison, Discrepancy, EqualityMask};
pub use pairs::{pair_indices, pairs};
pub use report::{ComparisonReport, Notice, OrderedMap, PairComparison, PairFailure, PairOutcome};
pub use run::{compare_tables, run, RunOptions, Source};

use crate::load::LoadError;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompareError {
    #[error("no rows to compare between `{left_column}` and `{right_column}`")]
    EmptyColumnComparison {
        left_column: String,
        right_column: String,
    },
    #[error("no columns to compare ({left_columns} vs {right_columns})")]
    NoColumnsToCompare {
        left_columns: usize,
        right_columns: usize,
    },
}

/// Why a table pair produced no statistics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairError {
    #[error("source `{source_name}`: {error}")]
    Source {
        source_name: String,
        error: LoadError,
    },
    #[error(transparent)]
    Compare(#[from] CompareError),
}

impl PairError {
    pub fn kind(&self) -> &'static str {
        match self {
            PairError::Source { error, .. } => error.kind(),
            PairError::Compare(CompareError::EmptyColumnComparison { .. }) => {
                "EmptyColumnComparison"
            }
            PairError::Compare(CompareError::NoColumnsToCompare { .. }) => "NoColumnsToCompare",
        }
    }
}

impl Serialize for PairError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PairError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}
