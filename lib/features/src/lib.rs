//! # clustx Features
//!
//! Feature preparation for clustering:
//!
//! - [`classify_columns`] - Tag every column as numeric, categorical or unusable
//! - [`FeaturePreprocessor`] - Build the standardized [`FeatureMatrix`](clustx_core::FeatureMatrix)
//! - [`load_dataset`] - Read CSV, JSON and JSON Lines files
//!
//! ## Example
//!
//! ```rust
//! use clustx_features::{read_csv, FeaturePreprocessor};
//!
//! let csv = "x,y\n1,2\n2,4\n3,7\n";
//! let dataset = read_csv(csv.as_bytes()).unwrap();
//! let prepared = FeaturePreprocessor::new().fit_transform(&dataset).unwrap();
//! assert_eq!(prepared.matrix.n_features(), 2);
//! ```

pub mod column;
pub mod ingest;
pub mod preprocess;

pub use column::{classify_columns, ColumnKind, ColumnProfile, UnusableReason};
pub use ingest::{load_dataset, parse_json, read_csv, InputFormat};
pub use preprocess::{
    prepare_features, CategoryCodes, Encoding, FeaturePreprocessor, PreparedFeatures,
    PreprocessReport, MISSING_PLACEHOLDER,
};
