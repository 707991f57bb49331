//! Pairwise positional comparison of tabular sources.
//!
//! Each pair of sources is aligned column-by-position and row-by-index; every
//! column pair reports how many rows agree and which rows do not.

pub mod compare;
pub mod config;
pub mod load;
pub mod output;
pub mod table;

pub use compare::{run, ComparisonReport, PairOutcome, RunOptions, Source};
pub use load::{FileLoader, LoadError, TableLoader};
pub use table::{CellValue, Column, Table};
