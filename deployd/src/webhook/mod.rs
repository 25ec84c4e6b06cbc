//! Webhook verification and dispatch

pub mod dispatch;
pub mod signature;
