//! Controller readiness
//!
//! A raw-mode bind resets the controller; the controller is considered up
//! once the Command Complete event for that reset is seen on the event stream.

use protocol::is_reset_complete;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Shared readiness flag, set at most once
#[derive(Debug, Clone, Default)]
pub struct ReadinessTracker {
    up: Arc<AtomicBool>,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Inspect an untagged event frame
    ///
    /// Returns true only for the call that flipped the flag.
    pub fn observe(&self, frame: &[u8]) -> bool {
        if !is_reset_complete(frame) {
            return false;
        }

        let flipped = self
            .up
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if flipped {
            info!("Controller reset complete");
        }
        flipped
    }
}
