use serde::{Deserialize, Serialize};

use crate::ItemInfo;

/// Event filter for subscribing to specific event types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Subscribe to layout change events (items moved, hidden, shown)
    #[serde(default)]
    pub layout: bool,
    /// Subscribe to accessibility permission change events
    #[serde(default)]
    pub permission: bool,
}

impl EventFilter {
    /// Create a filter that subscribes to all events
    pub fn all() -> Self {
        Self {
            layout: true,
            permission: true,
        }
    }

    /// Check if the filter matches a given event
    pub fn matches(&self, event: &StateEvent) -> bool {
        match event {
            StateEvent::LayoutChanged { .. } => self.layout,
            StateEvent::PermissionChanged { .. } => self.permission,
            StateEvent::Snapshot { .. } => true, // Snapshots always pass filter
        }
    }

    /// Check if any filter is set
    pub fn any(&self) -> bool {
        self.layout || self.permission
    }
}

/// Request to subscribe to state events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Whether to send a snapshot on connection
    #[serde(default)]
    pub snapshot: bool,
    /// Event filter (if not set or all false, subscribes to all events)
    #[serde(default)]
    pub filter: EventFilter,
}

impl SubscribeRequest {
    /// Create a subscribe request with snapshot enabled
    pub fn with_snapshot() -> Self {
        Self {
            snapshot: true,
            filter: EventFilter::default(),
        }
    }

    /// Get the effective filter (all if none specified)
    pub fn effective_filter(&self) -> EventFilter {
        if self.filter.any() {
            self.filter.clone()
        } else {
            EventFilter::all()
        }
    }
}

/// State change events sent to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The menu bar layout changed: emitted after every registry refresh
    LayoutChanged { items: Vec<ItemInfo> },

    /// Accessibility trust was granted or revoked
    PermissionChanged { granted: bool },

    /// Full state snapshot, sent on subscription when requested
    Snapshot {
        items: Vec<ItemInfo>,
        permission_granted: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_event() -> StateEvent {
        StateEvent::LayoutChanged { items: vec![] }
    }

    #[test]
    fn test_default_filter_matches_nothing_but_snapshot() {
        let filter = EventFilter::default();
        assert!(!filter.any());
        assert!(!filter.matches(&layout_event()));
        assert!(filter.matches(&StateEvent::Snapshot {
            items: vec![],
            permission_granted: false,
        }));
    }

    #[test]
    fn test_effective_filter_falls_back_to_all() {
        let request = SubscribeRequest::default();
        let filter = request.effective_filter();
        assert!(filter.matches(&layout_event()));
        assert!(filter.matches(&StateEvent::PermissionChanged { granted: true }));
    }

    #[test]
    fn test_with_snapshot_subscribes_to_everything() {
        let request = SubscribeRequest::with_snapshot();
        assert!(request.snapshot);
        assert!(request.effective_filter().matches(&layout_event()));
    }

    #[test]
    fn test_selective_filter() {
        let filter = EventFilter {
            layout: true,
            permission: false,
        };
        assert!(filter.matches(&layout_event()));
        assert!(!filter.matches(&StateEvent::PermissionChanged { granted: false }));
    }
}
