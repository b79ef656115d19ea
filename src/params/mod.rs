pub mod types;

pub use types::DynamicParams;

use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct ParamStore {
    snapshot: RwLock<Option<Arc<DynamicParams>>>,
}

impl ParamStore {
    pub fn new(initial: Option<DynamicParams>) -> Self {
        Self {
            snapshot: RwLock::new(initial.map(Arc::new)),
        }
    }

    /// Current snapshot, or `None` when no baseline was ever configured.
    pub fn get(&self) -> Option<Arc<DynamicParams>> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the snapshot atomically. Structurally equal values are a
    /// logged no-op so repeated identical updates produce no audit noise.
    pub fn set(&self, new_params: DynamicParams) {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.as_deref() == Some(&new_params) {
            tracing::info!(target: "params", "dynamic parameters unchanged");
            return;
        }

        tracing::info!(
            target: "params",
            minimum_accepted_speed = new_params.minimum_accepted_speed,
            minimum_accepted_efficiency = new_params.minimum_accepted_efficiency,
            single_pass_seconds = new_params.single_pass_seconds,
            "dynamic parameters replaced"
        );
        *guard = Some(Arc::new(new_params));
    }
}
