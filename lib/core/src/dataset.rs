//! Tabular dataset model
//!
//! A dataset is an ordered list of rows sharing one column set. Row order is
//! stable and is the implicit record index used to align cluster labels.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl Value {
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Render the value the way it is shown in narratives and category tables
    pub fn display_string(&self) -> Option<String> {
        match self {
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => write!(f, "N/A"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Missing
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Integers print without a trailing ".0"
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Row-ordered tabular data with a shared column set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Source name (usually the uploaded file name), used for terminology detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset, checking that every row has one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self {
            name: None,
            columns,
            rows,
        })
    }

    /// Build a dataset from named records. The column set is the union of
    /// record keys in first-appearance order; absent keys become `Missing`.
    pub fn from_records<I, R, K>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut index: ahash::AHashMap<String, usize> = ahash::AHashMap::new();
        let mut rows: Vec<Vec<Value>> = Vec::new();

        for record in records {
            let mut row = vec![Value::Missing; columns.len()];
            for (key, value) in record {
                let key = key.into();
                let col = match index.get(&key) {
                    Some(&col) => col,
                    None => {
                        let col = columns.len();
                        index.insert(key.clone(), col);
                        columns.push(key);
                        row.push(Value::Missing);
                        col
                    }
                };
                row[col] = value;
            }
            rows.push(row);
        }

        let width = columns.len();
        for row in &mut rows {
            row.resize(width, Value::Missing);
        }

        Self {
            name: None,
            columns,
            rows,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Find the first column whose name matches one of `candidates`, ignoring case
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(candidate))
        })
    }

    pub fn row(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            index,
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().enumerate().map(move |(index, values)| Record {
            index,
            columns: &self.columns,
            values,
        })
    }

    /// Iterate over one column's values in row order
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[col])
    }
}

/// Borrowed view of one dataset row
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    index: usize,
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    /// Position of this row in the dataset
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    #[inline]
    pub fn value(&self, col: usize) -> &'a Value {
        &self.values[col]
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Dataset::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Value::Number(1.0)]],
        );
        assert!(matches!(
            result,
            Err(Error::RaggedRow { row: 0, expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_from_records_unions_columns() {
        let dataset = Dataset::from_records(vec![
            vec![("a", Value::Number(1.0))],
            vec![("b", Value::from("x")), ("a", Value::Number(2.0))],
        ]);

        assert_eq!(dataset.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(dataset.n_rows(), 2);
        let first = dataset.row(0).unwrap();
        assert!(first.get("b").unwrap().is_missing());
        let second = dataset.row(1).unwrap();
        assert_eq!(second.get("a").unwrap().as_f64(), Some(2.0));
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let dataset = Dataset::new(
            vec!["OrigSeverity".to_string(), "Code".to_string()],
            vec![],
        )
        .unwrap();
        assert_eq!(dataset.find_column(&["severity", "origseverity"]), Some(0));
        assert_eq!(dataset.find_column(&["code"]), Some(1));
        assert_eq!(dataset.find_column(&["missing"]), None);
    }

    #[test]
    fn test_value_serde_untagged() {
        let values = vec![Value::Number(1.5), Value::from("a"), Value::Missing];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, "[1.5,\"a\",null]");
        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Missing.to_string(), "N/A");
    }
}
