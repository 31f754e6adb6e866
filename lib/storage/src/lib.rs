//! # clustx Storage
//!
//! Persistence of clustering runs:
//!
//! - [`ClusteringRun`] - Algorithm, labels, metrics and projection of one run
//! - [`FileRunStore`] - One JSON file per run, replaced atomically
//! - [`MemoryRunStore`] - In-process store for tests and embedding

pub mod run;
pub mod store;

pub use run::ClusteringRun;
pub use store::{FileRunStore, MemoryRunStore, RunStore};
