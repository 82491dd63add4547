use perch_ipc::{ItemInfo, StateEvent};
use tokio::sync::broadcast;

/// Broadcasts state change events to IPC subscribers.
#[derive(Clone)]
pub struct EventEmitter {
    event_tx: broadcast::Sender<StateEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    /// Get a receiver for the event server
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.event_tx.subscribe()
    }

    /// Send an event to all subscribers
    fn emit(&self, event: StateEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    pub fn emit_layout_changed(&self, items: Vec<ItemInfo>) {
        self.emit(StateEvent::LayoutChanged { items });
    }

    pub fn emit_permission_changed(&self, granted: bool) {
        self.emit(StateEvent::PermissionChanged { granted });
    }
}
