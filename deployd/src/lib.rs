//! Peers Deploy Dispatcher
//!
//! Receives signed push webhooks from GitHub and triggers the matching
//! build target as a detached background process. The webhook caller is
//! acknowledged before the deploy starts so that self-restarting deploys
//! never surface as gateway errors on the delivery.

pub mod config;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod server;
pub mod telemetry;
pub mod webhook;
