use core_types::{InstanceChartData, InstanceState};
use persistence::{PersistenceError, PersistenceStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The resident state and chart data of one instance.
///
/// Every mutation goes through [`update_state`](Self::update_state) or
/// [`update_chart`](Self::update_chart), which bump the matching version
/// counter under the same lock as the mutation itself. Counters therefore
/// never go backwards, however many commands run at once. When both locks are
/// needed the chart lock is taken first.
#[derive(Debug)]
pub struct InstanceHandle {
    name: String,
    state: Mutex<InstanceState>,
    chart: Mutex<InstanceChartData>,
    evicted: AtomicBool,
    // Serialises snapshots against each other and against eviction.
    persist_lock: tokio::sync::Mutex<()>,
}

impl InstanceHandle {
    pub fn new(name: impl Into<String>, state: InstanceState, chart: InstanceChartData) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(state),
            chart: Mutex::new(chart),
            evicted: AtomicBool::new(false),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> InstanceState {
        self.lock_state().clone()
    }

    pub fn chart(&self) -> InstanceChartData {
        self.lock_chart().clone()
    }

    /// `(state_version, chart_version)`.
    pub fn versions(&self) -> (u64, u64) {
        let state = self.lock_state();
        (state.state_version, state.chart_version)
    }

    /// Applies `f` to the state and bumps the state version.
    pub fn update_state<R>(&self, f: impl FnOnce(&mut InstanceState) -> R) -> R {
        let mut state = self.lock_state();
        let result = f(&mut state);
        state.state_version += 1;
        result
    }

    /// Applies `f` to the state and bumps the state version only if `f`
    /// reports a change.
    pub fn update_state_if(&self, f: impl FnOnce(&mut InstanceState) -> bool) -> bool {
        let mut state = self.lock_state();
        let changed = f(&mut state);
        if changed {
            state.state_version += 1;
        }
        changed
    }

    /// Applies `f` to the chart data and bumps the chart version.
    pub fn update_chart<R>(&self, f: impl FnOnce(&mut InstanceChartData) -> R) -> R {
        let mut chart = self.lock_chart();
        let result = f(&mut chart);
        self.lock_state().chart_version += 1;
        result
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    /// Detaches the handle from storage. Waits for a snapshot in progress, and
    /// every later [`persist`](Self::persist) is skipped.
    pub async fn evict(&self) {
        let _guard = self.persist_lock.lock().await;
        self.evicted.store(true, Ordering::Release);
    }

    /// Saves a consistent copy of both documents. Returns `false` without
    /// writing if the instance was evicted.
    pub async fn persist(&self, store: &dyn PersistenceStore) -> Result<bool, PersistenceError> {
        let _guard = self.persist_lock.lock().await;
        if self.is_evicted() {
            return Ok(false);
        }
        let (state, chart) = {
            let chart = self.lock_chart();
            let state = self.lock_state();
            (state.clone(), chart.clone())
        };
        store.save_instance(&self.name, &state, &chart).await?;
        Ok(true)
    }

    fn lock_state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_chart(&self) -> MutexGuard<'_, InstanceChartData> {
        self.chart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Candle, InstanceKind};
    use std::sync::Arc;

    fn handle() -> InstanceHandle {
        InstanceHandle::new(
            "[backtest]a",
            InstanceState::new(InstanceKind::Backtest),
            InstanceChartData::default(),
        )
    }

    #[test]
    fn each_update_bumps_its_own_counter() {
        let handle = handle();
        handle.update_state(|s| s.append_output("hello"));
        handle.update_chart(|c| {
            c.candles.push(Candle { timestamp: 0, open: 1.0, close: 1.0, high: 1.0, low: 1.0 })
        });
        handle.update_chart(|c| c.candles.clear());
        assert_eq!(handle.versions(), (1, 2));
        assert_eq!(handle.state().output, "hello\n");
    }

    #[test]
    fn conditional_update_skips_unchanged_state() {
        let handle = handle();
        assert!(handle.update_state_if(|s| s.add_input_key("pair", "USDT_ETH")));
        assert!(!handle.update_state_if(|s| s.add_input_key("pair", "USDT_BTC")));
        assert_eq!(handle.versions(), (1, 0));
        assert_eq!(handle.state().input["pair"], "USDT_ETH");
    }

    #[test]
    fn concurrent_updates_never_lose_a_version() {
        let handle = Arc::new(handle());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || {
                    let mut last = (0, 0);
                    for i in 0..250 {
                        if i % 2 == 0 {
                            handle.update_state(|s| s.status_text = i.to_string());
                        } else {
                            handle.update_chart(|c| c.operations.clear());
                        }
                        let seen = handle.versions();
                        assert!(seen.0 >= last.0 && seen.1 >= last.1);
                        last = seen;
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(handle.versions(), (1_000, 1_000));
    }
}
