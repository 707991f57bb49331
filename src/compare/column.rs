// src/compare/column.rs
use serde::Serialize;

use super::{AlignedColumns, CompareError};
use crate::table::{CellValue, Column};

/// One entry per shared row index: `true` where both cells are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityMask(Vec<bool>);

impl EqualityMask {
    /// Compare rows `0..min(left.len(), right.len())`. Rows past the shorter
    /// side are not part of the mask.
    pub fn build(left: &[CellValue], right: &[CellValue]) -> Self {
        Self(left.iter().zip(right).map(|(l, r)| l == r).collect())
    }

    pub fn rows_compared(&self) -> usize {
        self.0.len()
    }

    pub fn rows_equal(&self) -> usize {
        self.0.iter().filter(|&&eq| eq).count()
    }

    /// `None` when the mask is empty.
    pub fn fraction_equal(&self) -> Option<f64> {
        match self.rows_compared() {
            0 => None,
            n => Some(self.rows_equal() as f64 / n as f64),
        }
    }

    /// Row indices where the cells differ, ascending.
    pub fn mismatches(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(row, &eq)| (!eq).then_some(row))
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// A row whose two cells disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub row: usize,
    pub left: CellValue,
    pub right: CellValue,
}

/// Statistics and discrepancies for one column pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnComparison {
    pub left_column: String,
    pub right_column: String,
    pub rows_compared: usize,
    pub rows_equal: usize,
    pub fraction_equal: f64,
    pub discrepancies: Vec<Discrepancy>,
}

impl ColumnComparison {
    pub fn is_identical(&self) -> bool {
        self.rows_equal == self.rows_compared
    }
}

/// Collect every false entry of `mask` together with both cell values.
/// Rows missing from either column are skipped.
pub fn record_discrepancies(mask: &EqualityMask, left: &Column, right: &Column) -> Vec<Discrepancy> {
    mask.mismatches()
        .map_while(|row| {
            Some(Discrepancy {
                row,
                left: left.values.get(row)?.clone(),
                right: right.values.get(row)?.clone(),
            })
        })
        .collect()
}

/// Compare one aligned column pair. An empty overlap is an error rather
/// than a made-up ratio.
pub fn compare_columns(aligned: &AlignedColumns<'_>) -> Result<ColumnComparison, CompareError> {
    let mask = EqualityMask::build(&aligned.left.values, &aligned.right.values);
    let fraction_equal = mask
        .fraction_equal()
        .ok_or_else(|| CompareError::EmptyColumnComparison {
            left_column: aligned.left.name.clone(),
            right_column: aligned.right.name.clone(),
        })?;

    Ok(ColumnComparison {
        left_column: aligned.left.name.clone(),
        right_column: aligned.right.name.clone(),
        rows_compared: mask.rows_compared(),
        rows_equal: mask.rows_equal(),
        fraction_equal,
        discrepancies: record_discrepancies(&mask, aligned.left, aligned.right),
    })
}
