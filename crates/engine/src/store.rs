use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use nutrirec_core::{Dataset, RecError, Result, Snapshot};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::instructions::InstructionStore;

/// Anything that can resolve instructions text for a set of rows.
pub trait InstructionSource {
    fn fetch_instructions(&self, rows: &BTreeSet<usize>) -> FxHashMap<usize, String>;
}

impl InstructionSource for InstructionStore {
    fn fetch_instructions(&self, rows: &BTreeSet<usize>) -> FxHashMap<usize, String> {
        self.fetch(rows)
    }
}

/// Two-tier recipe storage: the resident snapshot, loaded at most once per
/// handle, and the disk-only instructions store.
#[derive(Debug)]
pub struct DatasetStore {
    snapshot_path: PathBuf,
    instructions: InstructionStore,
    dataset: OnceCell<Arc<Dataset>>,
}

impl DatasetStore {
    pub fn new<S: AsRef<Path>, I: AsRef<Path>>(snapshot_path: S, instructions_path: I) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            instructions: InstructionStore::new(instructions_path),
            dataset: OnceCell::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.snapshot_path, &config.instructions_path)
    }

    /// Wraps an already materialized dataset; `load` returns it unchanged.
    pub fn with_dataset(dataset: Dataset, instructions: InstructionStore) -> Self {
        Self {
            snapshot_path: PathBuf::new(),
            instructions,
            dataset: OnceCell::with_value(Arc::new(dataset)),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn instructions(&self) -> &InstructionStore {
        &self.instructions
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    /// Returns the resident dataset, reading the snapshot on first use.
    /// Concurrent first callers block until the single load finishes.
    pub fn load(&self) -> Result<Arc<Dataset>> {
        self.dataset
            .get_or_try_init(|| {
                let started = Instant::now();
                let dataset = Snapshot::load(&self.snapshot_path)?;
                info!(
                    path = %self.snapshot_path.display(),
                    rows = dataset.len(),
                    resident_mb = dataset.resident_bytes() / 1024 / 1024,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "recipe dataset ready"
                );
                if !self.instructions.is_available() {
                    warn!(
                        path = %self.instructions.path().display(),
                        "instructions store not found, recipes will have empty instructions"
                    );
                }
                Ok::<_, RecError>(Arc::new(dataset))
            })
            .cloned()
    }

    pub fn fetch_instructions(&self, rows: &BTreeSet<usize>) -> FxHashMap<usize, String> {
        self.instructions.fetch(rows)
    }
}

impl InstructionSource for DatasetStore {
    fn fetch_instructions(&self, rows: &BTreeSet<usize>) -> FxHashMap<usize, String> {
        DatasetStore::fetch_instructions(self, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrirec_core::NewRecipe;
    use tempfile::tempdir;

    fn tiny_dataset() -> Dataset {
        (0..3)
            .map(|idx| NewRecipe {
                name: format!("dish {idx}"),
                cook_time: String::new(),
                prep_time: String::new(),
                total_time: String::new(),
                ingredient_parts: String::new(),
                nutrition: [idx as f32; 9],
                food_type: "Any".to_string(),
            })
            .collect()
    }

    #[test]
    fn load_is_performed_once() {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("recipes.snapshot");
        Snapshot::save(&tiny_dataset(), &snapshot).unwrap();
        let store = DatasetStore::new(&snapshot, dir.path().join("instructions.sqlite"));
        assert!(!store.is_loaded());
        let first = store.load().unwrap();
        // Removing the file proves the second call never touches disk.
        std::fs::remove_file(&snapshot).unwrap();
        let second = store.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn missing_snapshot_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::new(
            dir.path().join("absent.snapshot"),
            dir.path().join("instructions.sqlite"),
        );
        assert!(matches!(
            store.load(),
            Err(RecError::StorageUnavailable { .. })
        ));
        assert!(!store.is_loaded());
    }

    #[test]
    fn missing_instructions_store_is_not_fatal() {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("recipes.snapshot");
        Snapshot::save(&tiny_dataset(), &snapshot).unwrap();
        let store = DatasetStore::new(&snapshot, dir.path().join("absent.sqlite"));
        store.load().unwrap();
        let rows: BTreeSet<usize> = [0, 2].into_iter().collect();
        let fetched = store.fetch_instructions(&rows);
        assert_eq!(fetched.len(), 2);
        assert!(fetched.values().all(String::is_empty));
    }
}
