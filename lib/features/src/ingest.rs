//! Dataset ingestion
//!
//! Loads CSV, JSON and JSON Lines files into a [`Dataset`]. Nested JSON
//! objects are flattened into `parent_child` columns.

use clustx_core::{Dataset, Error, Result, Value};
use serde_json::Map;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell contents treated as missing in delimited files
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const FLATTEN_SEPARATOR: &str = "_";

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
}

impl InputFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::JsonLines),
            _ => None,
        }
    }
}

/// Load a dataset from disk; the file name becomes the dataset name
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let format = InputFormat::from_path(path).ok_or_else(|| {
        Error::Parse(format!(
            "unsupported file type: {} (expected .csv, .json or .jsonl)",
            path.display()
        ))
    })?;

    let mut content = String::new();
    std::fs::File::open(path)?.read_to_string(&mut content)?;

    let dataset = match format {
        InputFormat::Csv => read_csv(content.as_bytes())?,
        InputFormat::Json | InputFormat::JsonLines => parse_json(&content)?,
    };
    debug!(
        "Loaded {} rows x {} columns from {}",
        dataset.n_rows(),
        dataset.n_columns(),
        path.display()
    );

    Ok(match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => dataset.with_name(name),
        None => dataset,
    })
}

/// Read a headed CSV document
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Parse(format!("CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Parse(format!("CSV row {}: {}", i + 1, e)))?;
        rows.push(record.iter().map(parse_cell).collect());
    }

    Dataset::new(columns, rows)
}

fn parse_cell(cell: &str) -> Value {
    if MISSING_TOKENS.contains(&cell) {
        return Value::Missing;
    }
    match cell.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(cell.to_string()),
    }
}

/// Parse a JSON document or JSON Lines stream.
///
/// Accepted shapes: an array of objects, a single object, an object whose
/// only member is an array of objects, and one object per line.
pub fn parse_json(content: &str) -> Result<Dataset> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::Parse("empty JSON document".to_string()));
    }

    if trimmed.starts_with('{') && trimmed.contains('\n') {
        if let Some(objects) = parse_json_lines(trimmed) {
            return Ok(records_to_dataset(objects));
        }
    }

    let document: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| Error::Parse(format!("invalid JSON: {}", e)))?;

    match document {
        serde_json::Value::Array(items) => {
            let objects = items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => Ok(map),
                    other => Err(Error::Parse(format!(
                        "expected an array of objects, found element {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(records_to_dataset(objects))
        }
        serde_json::Value::Object(map) => match envelope_records(&map) {
            Some(objects) => Ok(records_to_dataset(objects)),
            None => Ok(records_to_dataset(vec![map])),
        },
        other => Err(Error::Parse(format!(
            "expected a JSON object or array, found {}",
            other
        ))),
    }
}

/// Every non-empty line must be an object, otherwise the input is not JSON Lines
fn parse_json_lines(content: &str) -> Option<Vec<Map<String, serde_json::Value>>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match serde_json::from_str(line) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

/// `{"Results": [{...}, {...}]}` style wrappers
fn envelope_records(map: &Map<String, serde_json::Value>) -> Option<Vec<Map<String, serde_json::Value>>> {
    if map.len() != 1 {
        return None;
    }
    let items = map.values().next()?.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_object().cloned())
        .collect()
}

fn records_to_dataset(objects: Vec<Map<String, serde_json::Value>>) -> Dataset {
    Dataset::from_records(objects.into_iter().map(|object| {
        let mut fields = Vec::new();
        flatten_into(&object, "", &mut fields);
        fields
    }))
}

/// Flatten nested objects into `parent_child` keys.
///
/// Empty arrays become missing, single-element arrays are unwrapped and
/// longer arrays are joined into one text value.
pub fn flatten_into(object: &Map<String, serde_json::Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, FLATTEN_SEPARATOR, key)
        };
        flatten_value(value, name, out);
    }
}

fn flatten_value(value: &serde_json::Value, name: String, out: &mut Vec<(String, Value)>) {
    match value {
        serde_json::Value::Object(map) => flatten_into(map, &name, out),
        serde_json::Value::Array(items) => match items.as_slice() {
            [] => out.push((name, Value::Missing)),
            [single] => flatten_value(single, name, out),
            many => {
                let joined = many.iter().map(scalar_text).collect::<Vec<_>>().join(", ");
                out.push((name, Value::Text(joined)));
            }
        },
        scalar => out.push((name, scalar_value(scalar))),
    }
}

fn scalar_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Missing,
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        serde_json::Value::Number(n) => n.as_f64().map(Value::from).unwrap_or(Value::Missing),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
