//! Domain detection and the nouns used in generated sentences

use clustx_core::Dataset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    Iris,
    Customer,
    Network,
    Intrusion,
    Taxi,
    Alarm,
    Generic,
}

/// Nouns for one domain: `plural` for the things being clustered,
/// `items` for individual rows in detail listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminology {
    pub singular: String,
    pub plural: String,
    pub item: String,
    pub items: String,
}

impl Terminology {
    /// `plural` with its first letter upper-cased
    pub fn plural_capitalized(&self) -> String {
        capitalize(&self.plural)
    }
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl DataDomain {
    /// Guess the domain from the dataset name first, then from column names
    pub fn detect(dataset: &Dataset) -> Self {
        if let Some(name) = dataset.name() {
            let name = name.to_lowercase();
            let by_name = [
                (&["iris"][..], DataDomain::Iris),
                (&["customer", "segmentation"][..], DataDomain::Customer),
                (&["taxi", "trip"][..], DataDomain::Taxi),
                (&["intrusion"][..], DataDomain::Intrusion),
                (&["network"][..], DataDomain::Network),
                (&["alarm", "intersight"][..], DataDomain::Alarm),
            ];
            for (needles, domain) in by_name {
                if needles.iter().any(|n| name.contains(n)) {
                    return domain;
                }
            }
        }

        let columns: Vec<String> = dataset.columns().iter().map(|c| c.to_lowercase()).collect();
        let any_column = |needles: &[&str]| {
            columns
                .iter()
                .any(|c| needles.iter().any(|n| c.contains(n)))
        };
        if any_column(&["species", "petal", "sepal"]) {
            DataDomain::Iris
        } else if any_column(&["customer", "spending"]) {
            DataDomain::Customer
        } else if any_column(&["pickup", "dropoff", "fare"]) {
            DataDomain::Taxi
        } else if any_column(&["attack", "intrusion"]) {
            DataDomain::Intrusion
        } else if any_column(&["protocol", "src_bytes", "dst_bytes"]) {
            DataDomain::Network
        } else if any_column(&["severity", "code", "alarm"]) {
            DataDomain::Alarm
        } else {
            DataDomain::Generic
        }
    }

    pub fn terminology(&self) -> Terminology {
        let (singular, plural, item, items) = match self {
            DataDomain::Iris => ("flower", "flowers", "record", "records"),
            DataDomain::Customer => ("customer", "customers", "customer", "customers"),
            DataDomain::Network => ("event", "events", "connection", "connections"),
            DataDomain::Intrusion => ("event", "events", "event", "events"),
            DataDomain::Taxi => ("trip", "trips", "trip", "trips"),
            DataDomain::Alarm => ("alarm", "alarms", "alarm", "alarms"),
            DataDomain::Generic => ("record", "records", "record", "records"),
        };
        Terminology {
            singular: singular.to_string(),
            plural: plural.to_string(),
            item: item.to_string(),
            items: items.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustx_core::Value;

    fn dataset(columns: &[&str]) -> Dataset {
        let row = columns.iter().map(|_| Value::Number(1.0)).collect();
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), vec![row]).unwrap()
    }

    #[test]
    fn test_name_wins_over_columns() {
        let d = dataset(&["severity"]).with_name("iris.csv");
        assert_eq!(DataDomain::detect(&d), DataDomain::Iris);
    }

    #[test]
    fn test_detect_from_columns() {
        assert_eq!(DataDomain::detect(&dataset(&["Species", "x"])), DataDomain::Iris);
        assert_eq!(DataDomain::detect(&dataset(&["fare_amount"])), DataDomain::Taxi);
        assert_eq!(DataDomain::detect(&dataset(&["protocol_type"])), DataDomain::Network);
        assert_eq!(DataDomain::detect(&dataset(&["OrigSeverity"])), DataDomain::Alarm);
        assert_eq!(DataDomain::detect(&dataset(&["a", "b"])), DataDomain::Generic);
    }

    #[test]
    fn test_terminology() {
        let t = DataDomain::Network.terminology();
        assert_eq!(t.plural, "events");
        assert_eq!(t.items, "connections");
        assert_eq!(DataDomain::Generic.terminology().plural_capitalized(), "Records");
    }
}
