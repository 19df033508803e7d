use async_trait::async_trait;
use core_types::{InstanceChartData, InstanceState};
use persistence::{JsonFileStore, PersistenceError, PersistenceStore};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A [`JsonFileStore`] whose list saves and document removals can be made to
/// fail on demand.
pub struct FaultyStore {
    inner: JsonFileStore,
    pub fail_list_save: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: JsonFileStore) -> Self {
        Self {
            inner,
            fail_list_save: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }

    fn injected(&self) -> PersistenceError {
        PersistenceError::Io {
            path: self.inner.layout().instances_dir(),
            source: io::Error::other("injected failure"),
        }
    }
}

#[async_trait]
impl PersistenceStore for FaultyStore {
    async fn load_instance_list(&self) -> Result<Vec<String>, PersistenceError> {
        self.inner.load_instance_list().await
    }

    async fn save_instance_list(&self, names: &[String]) -> Result<(), PersistenceError> {
        if self.fail_list_save.load(Ordering::SeqCst) {
            return Err(self.injected());
        }
        self.inner.save_instance_list(names).await
    }

    async fn load_instance(
        &self,
        name: &str,
    ) -> Result<(InstanceState, InstanceChartData), PersistenceError> {
        self.inner.load_instance(name).await
    }

    async fn save_instance(
        &self,
        name: &str,
        state: &InstanceState,
        chart: &InstanceChartData,
    ) -> Result<(), PersistenceError> {
        self.inner.save_instance(name, state, chart).await
    }

    async fn remove_instance(&self, name: &str) -> Result<(), PersistenceError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(self.injected());
        }
        self.inner.remove_instance(name).await
    }
}

pub async fn json_store() -> (TempDir, Arc<JsonFileStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    (dir, Arc::new(store))
}

pub async fn faulty_store() -> (TempDir, Arc<FaultyStore>) {
    let (dir, store) = json_store().await;
    let store = Arc::try_unwrap(store).unwrap();
    (dir, Arc::new(FaultyStore::new(store)))
}

/// Writes a tick archive of one-minute rows from 2019-01-01T00:00:00Z with
/// the given close prices.
pub fn write_archive(dir: &TempDir, closes: &[f64]) -> String {
    let start_millis = 1_546_300_800_000_i64;
    let mut csv = String::from("time,open,close,high,low,volume\n");
    for (i, close) in closes.iter().enumerate() {
        let millis = start_millis + i as i64 * 60_000;
        csv.push_str(&format!("{millis},{close},{close},{close},{close},1\n"));
    }
    let path = dir.path().join("ticks.csv");
    std::fs::write(&path, csv).unwrap();
    path.to_string_lossy().into_owned()
}
