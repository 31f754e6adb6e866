// Run stores: one JSON file per run on disk, or a map in memory
use crate::run::ClusteringRun;
use anyhow::{Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const RUN_EXTENSION: &str = "json";

/// Persistence for clustering runs.
///
/// `save` assigns an id to runs that do not have one yet and returns the
/// stored record; saving a run that already has an id replaces it.
pub trait RunStore: Send + Sync {
    fn save(&self, run: ClusteringRun) -> Result<ClusteringRun>;

    fn load(&self, id: Uuid) -> Result<Option<ClusteringRun>>;

    /// Runs recorded for `dataset_name`, newest first
    fn list(&self, dataset_name: &str) -> Result<Vec<ClusteringRun>>;
}

fn assign_id(mut run: ClusteringRun) -> ClusteringRun {
    if run.id.is_nil() {
        run.id = Uuid::new_v4();
    }
    run
}

fn newest_first(runs: &mut [ClusteringRun]) {
    runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

pub struct FileRunStore {
    dir: PathBuf,
}

impl FileRunStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create run directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RUN_EXTENSION))
    }

    fn read_run(path: &Path) -> Result<ClusteringRun> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse run file {}", path.display()))
    }
}

impl RunStore for FileRunStore {
    fn save(&self, run: ClusteringRun) -> Result<ClusteringRun> {
        let run = assign_id(run);
        let path = self.run_path(run.id);
        let json = serde_json::to_vec_pretty(&run)?;

        // Write to a temp file and rename so readers never see a partial run
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&json))
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!(
            "Saved run {} for dataset '{}' ({} bytes)",
            run.id,
            run.dataset_name,
            json.len()
        );
        Ok(run)
    }

    fn load(&self, id: Uuid) -> Result<Option<ClusteringRun>> {
        let path = self.run_path(id);
        if !path.exists() {
            debug!("Run {} not found in {}", id, self.dir.display());
            return Ok(None);
        }
        Self::read_run(&path).map(Some)
    }

    fn list(&self, dataset_name: &str) -> Result<Vec<ClusteringRun>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(RUN_EXTENSION) {
                continue;
            }
            match Self::read_run(&path) {
                Ok(run) if run.dataset_name == dataset_name => runs.push(run),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable run file: {:#}", e),
            }
        }
        newest_first(&mut runs);
        Ok(runs)
    }
}

#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<Uuid, ClusteringRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}

impl RunStore for MemoryRunStore {
    fn save(&self, run: ClusteringRun) -> Result<ClusteringRun> {
        let run = assign_id(run);
        self.runs.write().insert(run.id, run.clone());
        debug!("Stored run {} in memory", run.id);
        Ok(run)
    }

    fn load(&self, id: Uuid) -> Result<Option<ClusteringRun>> {
        Ok(self.runs.read().get(&id).cloned())
    }

    fn list(&self, dataset_name: &str) -> Result<Vec<ClusteringRun>> {
        let mut runs: Vec<ClusteringRun> = self
            .runs
            .read()
            .values()
            .filter(|run| run.dataset_name == dataset_name)
            .cloned()
            .collect();
        newest_first(&mut runs);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clustx_cluster::{compute_metrics, project, AlgorithmChoice};
    use clustx_core::{FeatureMatrix, LabelAssignment};
    use tempfile::TempDir;

    fn sample_run(dataset_name: &str) -> ClusteringRun {
        let matrix = FeatureMatrix::from_rows(&[
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![0.05, 0.05],
            vec![5.0, 5.1],
            vec![5.1, 5.0],
            vec![5.05, 5.05],
        ])
        .unwrap();
        let labels = LabelAssignment::from_labels(vec![0, 0, 0, 1, 1, 1]);
        let metrics = compute_metrics(&matrix, &labels).unwrap();
        let projection = project(&matrix, &labels).unwrap();
        ClusteringRun::new(
            dataset_name,
            AlgorithmChoice::KMeans { n_clusters: 2 },
            labels,
            metrics,
            projection,
            matrix.feature_names().to_vec(),
        )
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();

        let run = sample_run("customers");
        assert!(!run.is_saved());
        let saved = store.save(run).unwrap();
        assert!(saved.is_saved());
        assert!(temp_dir.path().join(format!("{}.json", saved.id)).exists());

        let loaded = store.load(saved.id).unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_file_store_missing_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();
        assert!(store.load(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_misaligned_labels() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();
        let saved = store.save(sample_run("customers")).unwrap();

        let path = temp_dir.path().join(format!("{}.json", saved.id));
        let mut doc: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["labels"]["record_index"] = serde_json::json!([0]);
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        assert!(store.load(saved.id).is_err());
        assert!(store.list("customers").unwrap().is_empty());
    }

    #[test]
    fn test_file_store_overwrite_keeps_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();

        let mut saved = store.save(sample_run("customers")).unwrap();
        saved.dataset_name = "renamed".to_string();
        let resaved = store.save(saved.clone()).unwrap();
        assert_eq!(resaved.id, saved.id);

        assert!(store.list("customers").unwrap().is_empty());
        assert_eq!(store.list("renamed").unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_list_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();

        let mut older = sample_run("alarms");
        older.created_at = older.created_at - Duration::minutes(5);
        let older = store.save(older).unwrap();
        let newer = store.save(sample_run("alarms")).unwrap();
        store.save(sample_run("other")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();

        let runs = store.list("alarms").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, newer.id);
        assert_eq!(runs[1].id, older.id);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryRunStore::new();
        assert!(store.is_empty());

        let first = store.save(sample_run("iris")).unwrap();
        let second = store.save(sample_run("iris")).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 2);

        assert_eq!(store.load(first.id).unwrap(), Some(first));
        assert_eq!(store.list("iris").unwrap().len(), 2);
        assert!(store.list("taxi").unwrap().is_empty());
    }
}
