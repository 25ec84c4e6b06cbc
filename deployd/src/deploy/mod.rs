//! Deploy command execution

pub mod runner;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::TargetId;

/// Per-target deploy locks.
///
/// The deploy working directory is shared mutable state; overlapping
/// deliveries for the same target serialize on its lock while distinct
/// targets deploy independently.
pub struct TargetLocks {
    locks: HashMap<TargetId, Arc<Mutex<()>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        let locks = TargetId::ALL
            .iter()
            .map(|id| (*id, Arc::new(Mutex::new(()))))
            .collect();
        Self { locks }
    }

    pub fn get(&self, id: TargetId) -> Arc<Mutex<()>> {
        // All four targets are inserted in new(), so the lookup is total
        self.locks[&id].clone()
    }
}

impl Default for TargetLocks {
    fn default() -> Self {
        Self::new()
    }
}
