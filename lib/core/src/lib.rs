//! # clustx Core
//!
//! Core data model shared by every clustx crate:
//!
//! - [`Dataset`] - Row-ordered tabular data with typed [`Value`] cells
//! - [`FeatureMatrix`] - Standardized numeric matrix derived from a dataset
//! - [`LabelAssignment`] - Cluster labels aligned with matrix rows
//! - [`HeuristicsConfig`] - Named constants behind algorithm selection
//!
//! ## Example
//!
//! ```rust
//! use clustx_core::{Dataset, Value, LabelAssignment, NOISE};
//!
//! let dataset = Dataset::from_records(vec![
//!     vec![("x", Value::Number(1.0)), ("kind", Value::from("a"))],
//!     vec![("x", Value::Number(2.0)), ("kind", Value::from("b"))],
//! ]);
//! assert_eq!(dataset.n_rows(), 2);
//!
//! let labels = LabelAssignment::from_labels(vec![0, NOISE]);
//! assert_eq!(labels.noise_count(), 1);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod labels;
pub mod matrix;

/// Distance kernels over `f64` feature rows
pub mod distance;

pub use config::HeuristicsConfig;
pub use dataset::{Dataset, Record, Value};
pub use error::{Error, Result};
pub use labels::{LabelAssignment, NOISE};
pub use matrix::FeatureMatrix;
