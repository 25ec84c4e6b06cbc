//! Server state

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::deploy::runner::DeployRunner;
use crate::deploy::TargetLocks;

/// Server state shared across handlers
pub struct ServerState {
    pub config: Arc<Config>,
    pub runner: Arc<dyn DeployRunner>,
    pub deploy_locks: TargetLocks,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(config: Arc<Config>, runner: Arc<dyn DeployRunner>) -> Self {
        Self {
            config,
            runner,
            deploy_locks: TargetLocks::new(),
            started_at: Instant::now(),
        }
    }
}
