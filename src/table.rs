// src/table.rs

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single cell as produced by a loader.
///
/// Equality is plain value equality with one exception: `Int` and `Float`
/// compare numerically, so a CSV `1` matches a spreadsheet `1.0`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        use CellValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => int_equals_float(*a, *b),
            (Text(a), Text(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact: the float must be integral and inside the i64 range.
fn int_equals_float(i: i64, f: f64) -> bool {
    // 2^63 is exactly representable, i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) && i == f as i64
}

impl CellValue {
    /// Type a raw delimited-text field. Numbers and booleans are recognised
    /// after trimming; text is kept verbatim.
    pub fn infer(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if s.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        CellValue::Text(raw.to_string())
    }

    /// Integral floats that fit in an i64 collapse to `Int`.
    pub fn from_number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
            CellValue::Int(n as i64)
        } else {
            CellValue::Float(n)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "<null>"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Float(x)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("column `{column}` has {found} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// An in-memory table: ordered named columns of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, rejecting columns of differing lengths.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, TableError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::RaggedColumns {
                    column: bad.name.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            columns,
        })
    }

    /// Build a table from a header and row-major records. Short rows are
    /// padded with `Null`; the caller guarantees no row is longer than the header.
    pub fn from_rows(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for col in columns.iter_mut() {
                col.values.push(cells.next().unwrap_or(CellValue::Null));
            }
        }
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_types_fields() {
        assert_eq!(CellValue::infer(""), CellValue::Null);
        assert_eq!(CellValue::infer("   "), CellValue::Null);
        assert_eq!(CellValue::infer("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::infer("false"), CellValue::Bool(false));
        assert!(matches!(CellValue::infer(" 42 "), CellValue::Int(42)));
        assert!(matches!(CellValue::infer("2.5"), CellValue::Float(x) if x == 2.5));
        assert!(matches!(CellValue::infer(" Bob"), CellValue::Text(ref s) if s == " Bob"));
    }

    #[test]
    fn int_and_float_compare_numerically() {
        assert_eq!(CellValue::Int(1), CellValue::Float(1.0));
        assert_eq!(CellValue::Float(1.0), CellValue::Int(1));
        assert_ne!(CellValue::Int(1), CellValue::Float(1.5));
        assert_ne!(CellValue::Int(1), CellValue::Text("1".into()));
        assert_ne!(CellValue::Bool(true), CellValue::Int(1));
        assert_ne!(CellValue::Float(f64::NAN), CellValue::Float(f64::NAN));
        assert_eq!(CellValue::Null, CellValue::Null);
    }

    #[test]
    fn int_float_equality_is_exact_near_precision_limits() {
        assert_ne!(
            CellValue::Int(9_007_199_254_740_993),
            CellValue::Float(9_007_199_254_740_992.0)
        );
        assert_eq!(
            CellValue::Int(9_007_199_254_740_992),
            CellValue::Float(9_007_199_254_740_992.0)
        );
        assert_ne!(CellValue::Int(i64::MAX), CellValue::Float(9_223_372_036_854_775_808.0));
        assert_eq!(CellValue::Int(i64::MIN), CellValue::Float(-9_223_372_036_854_775_808.0));
        assert_ne!(CellValue::Int(0), CellValue::Float(f64::INFINITY));
        assert_ne!(CellValue::Int(0), CellValue::Float(f64::NAN));
    }

    #[test]
    fn from_number_collapses_integral_values() {
        assert!(matches!(CellValue::from_number(3.0), CellValue::Int(3)));
        assert!(matches!(CellValue::from_number(3.25), CellValue::Float(_)));
        assert!(matches!(CellValue::from_number(f64::INFINITY), CellValue::Float(_)));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Table::new(
            "t",
            vec![
                Column::new("a", vec![CellValue::Int(1), CellValue::Int(2)]),
                Column::new("b", vec![CellValue::Int(1)]),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedColumns {
                column: "b".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let t = Table::from_rows(
            "t",
            vec!["a".into(), "b".into()],
            vec![
                vec![CellValue::Int(1), "x".into()],
                vec![CellValue::Int(2)],
            ],
        );
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column("b").unwrap().values[1], CellValue::Null);
    }
}
