//! Accessibility trust tracking.
//!
//! Input injection silently does nothing without accessibility trust, so
//! every mutating operation checks the gate first and the daemon polls for
//! grant changes (there is no notification API for them).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::event_emitter::EventEmitter;
use crate::platform::TrustProvider;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct PermissionGate<T> {
    trust: T,
    granted: AtomicBool,
    emitter: EventEmitter,
}

impl<T: TrustProvider> PermissionGate<T> {
    pub fn new(trust: T, emitter: EventEmitter) -> Self {
        let granted = trust.is_trusted();
        Self {
            trust,
            granted: AtomicBool::new(granted),
            emitter,
        }
    }

    /// Last observed grant state, without querying the OS.
    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Relaxed)
    }

    /// Query the OS afresh, emitting an event if the state changed.
    pub fn check(&self) -> bool {
        let granted = self.trust.is_trusted();
        let previous = self.granted.swap(granted, Ordering::Relaxed);
        if granted != previous {
            tracing::info!("accessibility permission changed: granted={}", granted);
            self.emitter.emit_permission_changed(granted);
        }
        granted
    }

    /// Prompt the user for trust, then re-check.
    pub fn request(&self) -> bool {
        self.trust.request_trust();
        self.check()
    }

    pub async fn run_poll(&self) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            interval.tick().await;
            self.check();
        }
    }
}
