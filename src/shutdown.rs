//! Shutdown token module
//!
//! Cooperative cancellation for the two bridge activities. Both loops bound
//! their blocking waits and re-check the token, so a triggered token stops
//! the bridge without a full device reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag signalling the bridge activities to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create a new, untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; visible to every clone of this token
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
