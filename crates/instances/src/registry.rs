use crate::controller::{ControllerContext, InstanceController};
use crate::error::InstanceError;
use crate::handle::InstanceHandle;
use core_types::{InstanceChartData, InstanceKind, InstanceName, InstanceState};
use persistence::{PersistenceError, PersistenceStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Resident = HashMap<String, Arc<InstanceController>>;

/// The authoritative set of instance names plus the lazily loaded controllers
/// of the instances touched so far.
///
/// The name list is mirrored to the store on every change, and no name is
/// listed without both of its documents on disk. The name lock is held across
/// the store calls of `create` and `delete`, serialising them; the resident
/// map is only locked for lookups, inserts and evictions.
pub struct InstanceRegistry {
    store: Arc<dyn PersistenceStore>,
    names: tokio::sync::Mutex<Vec<String>>,
    resident: Mutex<Resident>,
}

impl InstanceRegistry {
    /// Opens the registry over `store`, reading the persisted name list.
    pub async fn open(store: Arc<dyn PersistenceStore>) -> Result<Self, InstanceError> {
        let names = store.load_instance_list().await?;
        tracing::info!(instances = names.len(), "Instance registry opened.");
        Ok(Self {
            store,
            names: tokio::sync::Mutex::new(names),
            resident: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &Arc<dyn PersistenceStore> {
        &self.store
    }

    /// Every instance name, in creation order.
    pub async fn list(&self) -> Vec<String> {
        self.names.lock().await.clone()
    }

    /// Number of instances currently loaded in memory.
    pub fn resident_count(&self) -> usize {
        self.lock_resident().len()
    }

    /// Returns the controller of `name`, loading and initialising it on first
    /// access. Either both documents load and the controller is cached, or
    /// nothing is cached and the error is returned.
    pub async fn resolve(&self, name: &str) -> Result<Arc<InstanceController>, InstanceError> {
        if let Some(controller) = self.lock_resident().get(name) {
            return Ok(Arc::clone(controller));
        }
        if !self.names.lock().await.iter().any(|n| n == name) {
            return Err(InstanceError::NotFound(name.to_string()));
        }

        let (state, chart) = match self.store.load_instance(name).await {
            Ok(pair) => pair,
            Err(PersistenceError::NotFound(_)) => {
                return Err(InstanceError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let kind = state.kind;
        let ctx = ControllerContext {
            handle: Arc::new(InstanceHandle::new(name, state, chart)),
            store: Arc::clone(&self.store),
        };
        let controller = Arc::new(InstanceController::new(kind, ctx));
        controller.initialize();

        // A delete may have run while the documents were loading.
        let names = self.names.lock().await;
        if !names.iter().any(|n| n == name) {
            return Err(InstanceError::NotFound(name.to_string()));
        }
        let mut resident = self.lock_resident();
        let entry = resident
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(instance = %name, %kind, "Instance loaded.");
                controller
            });
        Ok(Arc::clone(entry))
    }

    /// Creates the instance `[kind]label` with empty documents. The instance is
    /// not loaded; the first `resolve` reads it back from the store.
    pub async fn create(&self, kind: &str, label: &str) -> Result<InstanceName, InstanceError> {
        let name = InstanceName::new(kind, label)?;
        let kind: InstanceKind = kind.parse()?;

        let mut names = self.names.lock().await;
        if names.iter().any(|n| n == name.as_str()) {
            return Err(InstanceError::AlreadyExists(name.into_string()));
        }

        self.store
            .save_instance(name.as_str(), &InstanceState::new(kind), &InstanceChartData::default())
            .await?;
        names.push(name.to_string());
        if let Err(e) = self.store.save_instance_list(&names).await {
            names.pop();
            if let Err(cleanup) = self.store.remove_instance(name.as_str()).await {
                tracing::warn!(instance = %name, error = %cleanup, "Failed to remove documents of an unlisted instance.");
            }
            return Err(e.into());
        }
        tracing::info!(instance = %name, "Instance created.");
        Ok(name)
    }

    /// Creates an instance from a `kind:label` query.
    pub async fn create_from_query(&self, query: &str) -> Result<InstanceName, InstanceError> {
        let (kind, label) = InstanceName::split_query(query)?;
        self.create(kind, label).await
    }

    /// Deletes `name`: unlists it, evicts it from memory, then removes its
    /// documents.
    ///
    /// If the updated list cannot be saved nothing is changed. If the
    /// documents cannot be removed once the list is saved, the instance is
    /// gone from the list but its files linger; that is reported as
    /// [`InstanceError::Orphaned`]. Commands still running against the
    /// instance finish on the evicted copy, and their snapshots are dropped.
    pub async fn delete(&self, name: &str) -> Result<(), InstanceError> {
        let controller = self.resolve(name).await?;

        let mut names = self.names.lock().await;
        let Some(position) = names.iter().position(|n| n == name) else {
            return Err(InstanceError::NotFound(name.to_string()));
        };
        let removed = names.remove(position);
        if let Err(e) = self.store.save_instance_list(&names).await {
            names.insert(position, removed);
            return Err(e.into());
        }

        controller.teardown();
        controller.handle().evict().await;
        self.lock_resident().remove(name);

        self.store
            .remove_instance(name)
            .await
            .map_err(|source| InstanceError::Orphaned {
                name: name.to_string(),
                source,
            })?;
        tracing::info!(instance = %name, "Instance deleted.");
        Ok(())
    }

    /// Saves the resident state and chart data of `name` to the store.
    pub async fn snapshot(&self, name: &str) -> Result<(), InstanceError> {
        let controller = self.resolve(name).await?;
        controller.handle().persist(self.store.as_ref()).await?;
        Ok(())
    }

    /// Snapshots every resident instance. Failures are logged and the first
    /// one is returned once all instances were tried.
    pub async fn flush_all(&self) -> Result<usize, InstanceError> {
        let resident: Vec<Arc<InstanceController>> =
            self.lock_resident().values().cloned().collect();
        let mut first_error = None;
        let mut saved = 0;
        for controller in resident {
            match controller.handle().persist(self.store.as_ref()).await {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(instance = %controller.handle().name(), error = %e, "Failed to flush instance.");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(saved),
        }
    }

    fn lock_resident(&self) -> MutexGuard<'_, Resident> {
        self.resident.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::BacktestController;
    use crate::testing::{faulty_store, json_store};
    use core_types::CoreError;
    use persistence::JsonFileStore;
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn files_in(dir: &Path) -> BTreeSet<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    async fn registry_over(store: Arc<dyn PersistenceStore>) -> InstanceRegistry {
        InstanceRegistry::open(store).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_resolve_declares_defaults_once() {
        let (_dir, store) = json_store().await;
        let registry = registry_over(store).await;

        let name = registry.create("backtest", "eth1").await.unwrap();
        assert_eq!(name.as_str(), "[backtest]eth1");
        assert_eq!(registry.resident_count(), 0);

        let controller = registry.resolve("[backtest]eth1").await.unwrap();
        let state = controller.handle().state();
        assert_eq!(state.kind, InstanceKind::Backtest);
        assert_eq!((state.action1.as_str(), state.action2.as_str()), ("Run", ""));
        let expected: std::collections::BTreeMap<String, String> = BacktestController::required_input()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(state.input, expected);

        let versions = controller.handle().versions();
        controller.initialize();
        assert_eq!(controller.handle().versions(), versions);
        assert_eq!(controller.handle().state().input, expected);
    }

    #[tokio::test]
    async fn backtest_defaults_match_the_documented_values() {
        let (_dir, store) = json_store().await;
        let registry = registry_over(store).await;
        registry.create("backtest", "eth1").await.unwrap();
        let input = registry.resolve("[backtest]eth1").await.unwrap().handle().state().input;

        for (key, value) in [
            ("pair", "USDT_ETH"),
            ("period", "300"),
            ("warmupTicks", "300"),
            ("cooldownTicks", "300"),
            ("initialMoney", "100"),
            ("plotChart", "3"),
            ("ticks.csv.file", "../Bitfinex-historical-data/ETHUSD/Candles_1m/2019/merged.csv"),
            ("ticks.csv.startDate", "2019-01-01"),
            ("ticks.csv.endDate", "2019-01-04"),
            ("strategy.emaPeriods", "12,26"),
            ("strategy.openTradesCount", "5"),
            ("strategy.balanceMultiplier", "0.4"),
            ("strategy.buyCooldown", "5"),
            ("strategy.close.topLoss", "10"),
            ("strategy.close.sellBarrier1", "10"),
            ("strategy.close.tradeExpiry", "300"),
        ] {
            assert_eq!(input.get(key).map(String::as_str), Some(value), "key {key}");
        }
    }

    #[tokio::test]
    async fn every_kind_resolves_to_its_controller() {
        let (_dir, store) = json_store().await;
        let registry = registry_over(store).await;
        for kind in ["train", "LIVE", "backtest"] {
            let name = registry.create(kind, "x").await.unwrap();
            let controller = registry.resolve(name.as_str()).await.unwrap();
            assert_eq!(controller.kind().as_str(), kind.to_lowercase());
        }
        assert_eq!(registry.list().await, vec!["[train]x", "[live]x", "[backtest]x"]);
        let train = registry.resolve("[train]x").await.unwrap().handle().state();
        assert_eq!(train.action2, "Build model");
        assert!(!train.input.contains_key("strategy.emaPeriods"));
    }

    #[tokio::test]
    async fn duplicate_create_changes_nothing() {
        let (dir, store) = json_store().await;
        let registry = registry_over(store.clone()).await;
        registry.create("backtest", "eth1").await.unwrap();
        let controller = registry.resolve("[backtest]eth1").await.unwrap();
        controller.handle().update_state(|s| s.append_output("keep me"));
        registry.snapshot("[backtest]eth1").await.unwrap();
        let instances_dir = dir.path().join("instances");
        let before = std::fs::read(instances_dir.join("state-[backtest]eth1.json")).unwrap();

        let result = registry.create("BACKTEST", "eth1").await;
        assert!(matches!(result, Err(InstanceError::AlreadyExists(ref n)) if n == "[backtest]eth1"));
        assert_eq!(registry.list().await, vec!["[backtest]eth1"]);
        assert_eq!(store.load_instance_list().await.unwrap(), vec!["[backtest]eth1"]);
        let after = std::fs::read(instances_dir.join("state-[backtest]eth1.json")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn malformed_creates_are_rejected() {
        let (_dir, store) = json_store().await;
        let registry = registry_over(store).await;

        let error = registry.create("paper", "x").await.unwrap_err();
        assert!(matches!(error, InstanceError::InvalidName(CoreError::InvalidKind(_))));
        assert_eq!(error.kind(), "InvalidKind");
        assert!(matches!(
            registry.create_from_query("backtest").await,
            Err(InstanceError::InvalidName(CoreError::InvalidQuery(_)))
        ));
        assert!(matches!(
            registry.create_from_query("live:").await,
            Err(InstanceError::InvalidName(CoreError::InvalidLabel(_)))
        ));
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_names_are_not_found_and_touch_nothing() {
        let (dir, store) = json_store().await;
        let registry = registry_over(store).await;
        registry.create("live", "a").await.unwrap();
        let instances_dir = dir.path().join("instances");
        let before = files_in(&instances_dir);

        assert!(matches!(registry.resolve("[live]b").await, Err(InstanceError::NotFound(_))));
        assert!(matches!(registry.delete("[live]b").await, Err(InstanceError::NotFound(_))));
        assert_eq!(files_in(&instances_dir), before);
        assert_eq!(registry.list().await, vec!["[live]a"]);
    }

    #[tokio::test]
    async fn resolve_caches_one_controller_per_name() {
        let (_dir, store) = json_store().await;
        let registry = registry_over(store).await;
        registry.create("train", "t").await.unwrap();
        let first = registry.resolve("[train]t").await.unwrap();
        let second = registry.resolve("[train]t").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.resident_count(), 1);
    }

    #[tokio::test]
    async fn delete_removes_name_memory_and_documents() {
        let (dir, store) = json_store().await;
        let registry = registry_over(store.clone()).await;
        registry.create("backtest", "a").await.unwrap();
        registry.create("backtest", "b").await.unwrap();
        let controller = registry.resolve("[backtest]a").await.unwrap();

        registry.delete("[backtest]a").await.unwrap();
        assert_eq!(registry.list().await, vec!["[backtest]b"]);
        assert_eq!(store.load_instance_list().await.unwrap(), vec!["[backtest]b"]);
        assert_eq!(registry.resident_count(), 0);
        assert!(controller.handle().is_evicted());
        assert_eq!(
            files_in(&dir.path().join("instances")),
            BTreeSet::from([
                "chartData-[backtest]b.json".to_string(),
                "list.json".to_string(),
                "state-[backtest]b.json".to_string(),
            ])
        );
        assert!(matches!(registry.resolve("[backtest]a").await, Err(InstanceError::NotFound(_))));

        // Snapshots of the evicted copy never recreate the documents.
        assert!(!controller.handle().persist(store.as_ref()).await.unwrap());
        assert!(!dir.path().join("instances/state-[backtest]a.json").exists());
    }

    #[tokio::test]
    async fn failed_list_save_aborts_delete_before_removing_documents() {
        let (dir, store) = faulty_store().await;
        let registry = registry_over(store.clone()).await;
        registry.create("live", "a").await.unwrap();

        store.fail_list_save.store(true, Ordering::SeqCst);
        let error = registry.delete("[live]a").await.unwrap_err();
        assert_eq!(error.kind(), "Persistence");
        assert_eq!(registry.list().await, vec!["[live]a"]);
        assert!(dir.path().join("instances/state-[live]a.json").exists());
        assert!(dir.path().join("instances/chartData-[live]a.json").exists());
        assert!(!registry.resolve("[live]a").await.unwrap().handle().is_evicted());
    }

    #[tokio::test]
    async fn failed_document_removal_reports_an_orphan() {
        let (dir, store) = faulty_store().await;
        let registry = registry_over(store.clone()).await;
        registry.create("live", "a").await.unwrap();

        store.fail_remove.store(true, Ordering::SeqCst);
        let error = registry.delete("[live]a").await.unwrap_err();
        assert!(matches!(error, InstanceError::Orphaned { ref name, .. } if name == "[live]a"));
        assert!(registry.list().await.is_empty());
        assert!(store.load_instance_list().await.unwrap().is_empty());
        assert!(dir.path().join("instances/state-[live]a.json").exists());
        // Lingering documents are never resurrected.
        assert!(matches!(registry.resolve("[live]a").await, Err(InstanceError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_list_save_rolls_back_create() {
        let (dir, store) = faulty_store().await;
        let registry = registry_over(store.clone()).await;

        store.fail_list_save.store(true, Ordering::SeqCst);
        assert!(matches!(registry.create("train", "t").await, Err(InstanceError::Persistence(_))));
        assert!(registry.list().await.is_empty());
        assert_eq!(files_in(&dir.path().join("instances")), BTreeSet::from(["list.json".to_string()]));

        store.fail_list_save.store(false, Ordering::SeqCst);
        registry.create("train", "t").await.unwrap();
    }

    #[tokio::test]
    async fn reopened_registry_reads_the_persisted_list() {
        let (dir, store) = json_store().await;
        let registry = registry_over(store).await;
        registry.create("backtest", "a").await.unwrap();
        let controller = registry.resolve("[backtest]a").await.unwrap();
        controller.handle().update_state(|s| s.append_output("hello"));
        assert_eq!(registry.flush_all().await.unwrap(), 1);
        drop(registry);

        let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
        let reopened = registry_over(store).await;
        assert_eq!(reopened.list().await, vec!["[backtest]a"]);
        let state = reopened.resolve("[backtest]a").await.unwrap().handle().state();
        assert_eq!(state.output, "hello\n");
    }
}
