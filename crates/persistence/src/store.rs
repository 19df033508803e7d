use crate::error::PersistenceError;
use crate::layout::DataLayout;
use async_trait::async_trait;
use core_types::{InstanceChartData, InstanceState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

/// Reads and writes instance documents.
///
/// The state and chart-data documents of an instance are always loaded and
/// saved as a pair.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// The authoritative list of instance names.
    async fn load_instance_list(&self) -> Result<Vec<String>, PersistenceError>;

    async fn save_instance_list(&self, names: &[String]) -> Result<(), PersistenceError>;

    /// Loads both documents of `name`. Fails with `NotFound` if either is missing.
    async fn load_instance(
        &self,
        name: &str,
    ) -> Result<(InstanceState, InstanceChartData), PersistenceError>;

    async fn save_instance(
        &self,
        name: &str,
        state: &InstanceState,
        chart: &InstanceChartData,
    ) -> Result<(), PersistenceError>;

    /// Removes both documents of `name`. A document that is already gone is
    /// not an error.
    async fn remove_instance(&self, name: &str) -> Result<(), PersistenceError>;
}

/// A [`PersistenceStore`] keeping one JSON file per document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    layout: DataLayout,
}

impl JsonFileStore {
    /// Opens the store at `data_dir`, creating the directory layout and an
    /// empty instance list on first use.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let layout = DataLayout::new(data_dir.as_ref());
        layout.ensure().await?;
        let store = Self { layout };

        let list_path = store.layout.list_path();
        let exists = tokio::fs::try_exists(&list_path)
            .await
            .map_err(|e| PersistenceError::io(&list_path, e))?;
        if !exists {
            tracing::info!(path = %list_path.display(), "Populating an empty instance list.");
            write_json(&list_path, &Vec::<String>::new()).await?;
        }
        Ok(store)
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn load_instance_list(&self) -> Result<Vec<String>, PersistenceError> {
        read_json(&self.layout.list_path()).await
    }

    async fn save_instance_list(&self, names: &[String]) -> Result<(), PersistenceError> {
        write_json(&self.layout.list_path(), &names).await
    }

    async fn load_instance(
        &self,
        name: &str,
    ) -> Result<(InstanceState, InstanceChartData), PersistenceError> {
        let not_found = |err: PersistenceError| match err {
            PersistenceError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                PersistenceError::NotFound(name.to_string())
            }
            other => other,
        };
        let state = read_json(&self.layout.state_path(name))
            .await
            .map_err(not_found)?;
        let chart = read_json(&self.layout.chart_path(name))
            .await
            .map_err(not_found)?;
        Ok((state, chart))
    }

    async fn save_instance(
        &self,
        name: &str,
        state: &InstanceState,
        chart: &InstanceChartData,
    ) -> Result<(), PersistenceError> {
        write_json(&self.layout.state_path(name), state).await?;
        write_json(&self.layout.chart_path(name), chart).await
    }

    async fn remove_instance(&self, name: &str) -> Result<(), PersistenceError> {
        for path in [self.layout.state_path(name), self.layout.chart_path(name)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Document already removed.");
                }
                Err(e) => return Err(PersistenceError::io(&path, e)),
            }
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PersistenceError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes to a temporary sibling first and renames it over the target, so a
/// reader never observes a partially written document.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec(value).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| PersistenceError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| PersistenceError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Candle, InstanceKind};
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_seeds_an_empty_list() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.load_instance_list().await.unwrap().is_empty());
        assert!(store.layout().models_dir().is_dir());
        assert!(store.layout().trainings_dir().is_dir());
    }

    #[tokio::test]
    async fn open_keeps_an_existing_list() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .save_instance_list(&["[live]a".to_string()])
            .await
            .unwrap();
        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load_instance_list().await.unwrap(), vec!["[live]a"]);
    }

    #[tokio::test]
    async fn instance_documents_are_saved_and_loaded_as_a_pair() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let mut state = InstanceState::new(InstanceKind::Backtest);
        state.add_input_key("pair", "USDT_ETH");
        state.state_version = 4;
        let chart = InstanceChartData {
            candles: vec![Candle { timestamp: 60, open: 1.0, close: 2.0, high: 3.0, low: 0.5 }],
            ..Default::default()
        };
        store.save_instance("[backtest]a", &state, &chart).await.unwrap();

        let (loaded_state, loaded_chart) = store.load_instance("[backtest]a").await.unwrap();
        assert_eq!(loaded_state, state);
        assert_eq!(loaded_chart, chart);
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.load_instance("[live]ghost").await,
            Err(PersistenceError::NotFound(name)) if name == "[live]ghost"
        ));

        // A lone state document is not a loadable instance either.
        let state = InstanceState::new(InstanceKind::Live);
        write_json(&store.layout().state_path("[live]half"), &state).await.unwrap();
        assert!(matches!(
            store.load_instance("[live]half").await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_document_is_a_json_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(store.layout().state_path("[live]bad"), b"{not json")
            .await
            .unwrap();
        tokio::fs::write(store.layout().chart_path("[live]bad"), b"{}")
            .await
            .unwrap();
        assert!(matches!(
            store.load_instance("[live]bad").await,
            Err(PersistenceError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn remove_deletes_both_documents_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let state = InstanceState::new(InstanceKind::Train);
        store
            .save_instance("[train]t", &state, &InstanceChartData::default())
            .await
            .unwrap();
        store.remove_instance("[train]t").await.unwrap();
        assert!(!store.layout().state_path("[train]t").exists());
        assert!(!store.layout().chart_path("[train]t").exists());
        store.remove_instance("[train]t").await.unwrap();
    }
}
