//! Generic rendering of one dataset row for narratives and listings

use clustx_core::{Dataset, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAME_FIELDS: &[&str] = &["name", "Name", "id", "ID", "CustomerID", "code", "Code", "species"];
const SEVERITY_FIELDS: &[&str] = &[
    "severity",
    "Severity",
    "OrigSeverity",
    "priority",
    "Priority",
    "importance",
];
const DESCRIPTION_FIELDS: &[&str] = &["description", "Description", "details", "Details", "species"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDetails {
    /// Dataset row position
    pub index: usize,
    pub name: String,
    pub severity: String,
    pub description: String,
    /// Every other non-missing field, rendered as text
    pub additional_info: BTreeMap<String, String>,
}

impl RecordDetails {
    pub fn from_record(record: &Record<'_>) -> Self {
        let name = first_present(record, NAME_FIELDS).or_else(|| {
            record
                .fields()
                .next()
                .map(|(column, value)| (column, value.display_string().unwrap_or_default()))
        });
        let severity = first_present(record, SEVERITY_FIELDS);
        let description = first_present(record, DESCRIPTION_FIELDS);

        let used: Vec<&str> = [&name, &severity, &description]
            .iter()
            .filter_map(|field| field.as_ref().map(|(column, _)| *column))
            .collect();
        let additional_info = record
            .fields()
            .filter(|(column, _)| !used.contains(column))
            .filter_map(|(column, value)| value.display_string().map(|v| (column.to_string(), v)))
            .collect();

        Self {
            index: record.index(),
            name: name.map(|(_, v)| v).unwrap_or_else(|| "N/A".to_string()),
            severity: severity
                .map(|(_, v)| v)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "Normal".to_string()),
            description: description.map(|(_, v)| v).unwrap_or_default(),
            additional_info,
        }
    }
}

/// Column and rendered value of the first of `fields` present in `record`
fn first_present<'a>(record: &Record<'a>, fields: &[&str]) -> Option<(&'a str, String)> {
    fields.iter().find_map(|f| {
        record
            .fields()
            .find(|(column, _)| column == f)
            .map(|(column, value)| (column, value.display_string().unwrap_or_default()))
    })
}

/// Details of the dataset rows at `rows`, skipping positions outside the dataset
pub fn extract_records(dataset: &Dataset, rows: &[usize]) -> Vec<RecordDetails> {
    rows.iter()
        .filter_map(|&i| dataset.row(i))
        .map(|record| RecordDetails::from_record(&record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustx_core::Value;

    #[test]
    fn test_named_fields() {
        let dataset = Dataset::from_records(vec![vec![
            ("Code", Value::from("F0283")),
            ("OrigSeverity", Value::from("Critical")),
            ("Description", Value::from("Fan failed")),
            ("Rack", Value::Number(4.0)),
            ("Note", Value::Missing),
        ]]);
        let record = extract_records(&dataset, &[0]).remove(0);
        assert_eq!(record.index, 0);
        assert_eq!(record.name, "F0283");
        assert_eq!(record.severity, "Critical");
        assert_eq!(record.description, "Fan failed");
        assert_eq!(record.additional_info.len(), 1);
        assert_eq!(record.additional_info["Rack"], "4");
    }

    #[test]
    fn test_falls_back_to_first_column() {
        let dataset = Dataset::from_records(vec![vec![
            ("sepal_length", Value::Number(5.1)),
            ("petal_width", Value::Number(0.2)),
        ]]);
        let record = extract_records(&dataset, &[0, 9]).remove(0);
        assert_eq!(record.name, "5.1");
        assert_eq!(record.severity, "Normal");
        assert_eq!(record.description, "");
        assert_eq!(record.additional_info.keys().collect::<Vec<_>>(), vec!["petal_width"]);
    }
}
