// src/compare/align.rs
use crate::table::{Column, Table};

/// Column `position` of the left table matched with the same position on the right.
#[derive(Debug, Clone, Copy)]
pub struct AlignedColumns<'a> {
    pub position: usize,
    pub left: &'a Column,
    pub right: &'a Column,
}

impl AlignedColumns<'_> {
    /// `"{left}_vs_{right}"`
    pub fn key(&self) -> String {
        format!("{}_vs_{}", self.left.name, self.right.name)
    }
}

#[derive(Debug)]
pub struct ColumnAlignment<'a> {
    pub pairs: Vec<AlignedColumns<'a>>,
    pub left_columns: usize,
    pub right_columns: usize,
}

impl ColumnAlignment<'_> {
    /// Columns of the wider table that have no partner.
    pub fn unmatched(&self) -> usize {
        self.left_columns.abs_diff(self.right_columns)
    }
}

/// Match columns by position over `0..min(left, right)`; trailing columns of
/// the wider table are left out.
pub fn align<'a>(left: &'a Table, right: &'a Table) -> ColumnAlignment<'a> {
    let pairs = left
        .columns()
        .iter()
        .zip(right.columns())
        .enumerate()
        .map(|(position, (l, r))| AlignedColumns {
            position,
            left: l,
            right: r,
        })
        .collect();

    ColumnAlignment {
        pairs,
        left_columns: left.column_count(),
        right_columns: right.column_count(),
    }
}
