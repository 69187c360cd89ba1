use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::services::aggregator::CancelFlag;
use crate::services::power_service::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Map of run_id to the cancel flag of a run in progress
    pub runs: Arc<RwLock<HashMap<String, CancelFlag>>>,
    pub cache_enabled: bool,
}

impl AppState {
    pub fn new(engine: Engine, cache_enabled: bool) -> Self {
        Self {
            engine: Arc::new(engine),
            runs: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled,
        }
    }

    /// Registers a run; `None` when the id is already taken by a live run.
    pub fn register_run(&self, run_id: &str) -> Option<CancelFlag> {
        let mut map = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(run_id) {
            return None;
        }
        let flag = CancelFlag::new();
        map.insert(run_id.to_string(), flag.clone());
        Some(flag)
    }

    pub fn finish_run(&self, run_id: &str) {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(run_id);
    }

    /// Trips the run's flag. Returns false for an unknown id.
    pub fn cancel_run(&self, run_id: &str) -> bool {
        let map = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        match map.get(run_id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn active_runs(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Unregisters the run when the request future completes or is dropped.
pub struct RunGuard {
    state: AppState,
    run_id: String,
}

impl RunGuard {
    pub fn new(state: AppState, run_id: String) -> Self {
        Self { state, run_id }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.finish_run(&self.run_id);
    }
}
