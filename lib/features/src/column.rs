//! Column classification
//!
//! Every dataset column is tagged once as numeric, categorical or unusable
//! before any feature is built from it.

use ahash::AHashSet;
use clustx_core::{Dataset, Value};
use serde::{Deserialize, Serialize};

/// Why a column cannot contribute a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusableReason {
    /// Every value is missing
    AllMissing,
    /// Numeric with a single distinct value
    Constant,
    /// Categorical with a single distinct value, counting the missing placeholder
    SingleCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every present value is a number and at least two distinct numbers occur
    Numeric,
    /// Text (or mixed) values with at least two distinct categories
    Categorical,
    Unusable(UnusableReason),
}

impl ColumnKind {
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }

    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::Categorical)
    }

    #[inline]
    pub fn is_usable(&self) -> bool {
        !matches!(self, ColumnKind::Unusable(_))
    }
}

/// Classification result for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Distinct present values (missing excluded)
    pub distinct_values: usize,
    pub missing_count: usize,
    /// True when every present value is a number, whether or not the column is usable
    pub numeric_typed: bool,
}

/// Classify every column of `dataset`, in column order
pub fn classify_columns(dataset: &Dataset) -> Vec<ColumnProfile> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(col, name)| profile_column(name, dataset.column_values(col)))
        .collect()
}

fn profile_column<'a>(name: &str, values: impl Iterator<Item = &'a Value>) -> ColumnProfile {
    let mut numbers: AHashSet<u64> = AHashSet::new();
    let mut texts: AHashSet<String> = AHashSet::new();
    let mut has_text = false;
    let mut missing_count = 0;
    let mut present = 0;

    for value in values {
        match value {
            Value::Number(n) => {
                present += 1;
                // -0.0 and 0.0 are the same category
                let n = if *n == 0.0 { 0.0 } else { *n };
                numbers.insert(n.to_bits());
                texts.insert(value.to_string());
            }
            Value::Text(s) => {
                present += 1;
                has_text = true;
                texts.insert(s.clone());
            }
            Value::Missing => missing_count += 1,
        }
    }

    let numeric_typed = present > 0 && !has_text;
    let distinct_values = if numeric_typed { numbers.len() } else { texts.len() };

    let kind = if present == 0 {
        ColumnKind::Unusable(UnusableReason::AllMissing)
    } else if numeric_typed {
        if distinct_values > 1 {
            ColumnKind::Numeric
        } else {
            ColumnKind::Unusable(UnusableReason::Constant)
        }
    } else {
        // the missing placeholder counts as one more category
        let categories = distinct_values + usize::from(missing_count > 0);
        if categories > 1 {
            ColumnKind::Categorical
        } else {
            ColumnKind::Unusable(UnusableReason::SingleCategory)
        }
    };

    ColumnProfile {
        name: name.to_string(),
        kind,
        distinct_values,
        missing_count,
        numeric_typed,
    }
}
