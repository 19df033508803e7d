use crate::error::PersistenceError;
use std::path::{Path, PathBuf};

/// The on-disk layout below the base data directory.
///
/// ```text
/// {data_dir}/instances/list.json
/// {data_dir}/instances/state-{name}.json
/// {data_dir}/instances/chartData-{name}.json
/// {data_dir}/models/
/// {data_dir}/trainings/
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join("instances")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn trainings_dir(&self) -> PathBuf {
        self.data_dir.join("trainings")
    }

    pub fn list_path(&self) -> PathBuf {
        self.instances_dir().join("list.json")
    }

    pub fn state_path(&self, name: &str) -> PathBuf {
        self.instances_dir().join(format!("state-{name}.json"))
    }

    pub fn chart_path(&self, name: &str) -> PathBuf {
        self.instances_dir().join(format!("chartData-{name}.json"))
    }

    /// Creates every directory of the layout that does not exist yet.
    pub async fn ensure(&self) -> Result<(), PersistenceError> {
        for dir in [self.instances_dir(), self.models_dir(), self.trainings_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| PersistenceError::io(&dir, e))?;
        }
        Ok(())
    }
}
