//! Background session validation.
//!
//! Runs one validation immediately, then one every period. The timer is
//! cancelled when the handle is dropped, so a discarded session never keeps
//! a timer firing against it.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;

use crate::auth::coordinator::RefreshCoordinator;

/// Handle to the recurring validation task
pub struct PeriodicValidator {
    handle: JoinHandle<()>,
}

impl PeriodicValidator {
    /// Start validating on the given period. The first tick fires
    /// immediately.
    pub fn spawn(coordinator: Arc<RefreshCoordinator>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if !coordinator.validate_once().await {
                    debug!("periodic validation negative");
                }
            }
        });
        Self { handle }
    }

    /// Stop the recurring validation
    pub fn shutdown(self) {
        // Drop aborts the task
    }

    /// Whether the background task has stopped
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicValidator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
