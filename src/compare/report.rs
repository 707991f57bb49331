// src/compare/report.rs
use indexmap::IndexMap;
use serde::Serialize;

use super::{ColumnComparison, PairError};

/// Insertion-ordered string-keyed map. Serialises as a map in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrderedMap<V> {
    entries: IndexMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `key`, or under `key#2`, `key#3`, ... if taken.
    /// Returns the key actually used.
    pub fn insert_unique(&mut self, key: String, value: V) -> String {
        let mut candidate = key.clone();
        let mut n = 1;
        while self.entries.contains_key(&candidate) {
            n += 1;
            candidate = format!("{}#{}", key, n);
        }
        self.entries.insert(candidate.clone(), value);
        candidate
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Informational conditions that do not stop a pair from being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Notice {
    /// Trailing columns of the wider table were not compared.
    ColumnCountMismatch {
        left_columns: usize,
        right_columns: usize,
    },
    /// Trailing rows of the longer table were not compared.
    RowCountMismatch { left_rows: usize, right_rows: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairComparison {
    pub left_source: String,
    pub right_source: String,
    pub notices: Vec<Notice>,
    pub columns: OrderedMap<ColumnComparison>,
}

impl PairComparison {
    pub fn is_identical(&self) -> bool {
        self.columns.values().all(ColumnComparison::is_identical)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
    pub left_source: String,
    pub right_source: String,
    pub errors: Vec<PairError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Compared(PairComparison),
    Failed(PairFailure),
}

impl PairOutcome {
    pub fn comparison(&self) -> Option<&PairComparison> {
        match self {
            PairOutcome::Compared(c) => Some(c),
            PairOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PairFailure> {
        match self {
            PairOutcome::Compared(_) => None,
            PairOutcome::Failed(f) => Some(f),
        }
    }
}

/// Every table pair of a run, keyed `"{left}_vs_{right}"` in enumeration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ComparisonReport {
    pub pairs: OrderedMap<PairOutcome>,
}

impl ComparisonReport {
    pub fn get(&self, key: &str) -> Option<&PairOutcome> {
        self.pairs.get(key)
    }

    pub fn compared(&self) -> impl Iterator<Item = (&str, &PairComparison)> {
        self.pairs
            .iter()
            .filter_map(|(k, o)| o.comparison().map(|c| (k, c)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PairFailure)> {
        self.pairs
            .iter()
            .filter_map(|(k, o)| o.failure().map(|f| (k, f)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}
