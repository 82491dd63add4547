//! Operation coordination: resolves items, computes drag targets, performs
//! the gesture, and verifies the item actually moved.
//!
//! Operations on the same item are serialized through a per-name lock so two
//! concurrent requests cannot interleave their drags; operations on distinct
//! items may overlap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex;

use perch_ipc::ItemInfo;

use crate::core::{self, ItemRegistry, MenuBarItem};
use crate::event_emitter::EventEmitter;
use crate::gesture::GestureSimulator;
use crate::permission::PermissionGate;
use crate::platform::{InjectError, InputInjector, Point, TrustProvider, WindowSystem};
use crate::store::SettingsStore;

/// Minimum horizontal displacement that counts as a successful drag.
const MIN_MOVE_DELTA: f64 = 10.0;
/// Drag attempts per operation before giving up.
const MAX_ATTEMPTS: u32 = 3;
/// Wait after a drag before re-reading window positions.
const SETTLE_DELAY: Duration = Duration::from_millis(200);
/// Wait between failed attempts.
const RETRY_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error("accessibility permission not granted")]
    PermissionDenied,
    #[error("no menu bar item named '{0}'")]
    ItemNotFound(String),
    #[error("item '{0}' has no on-screen position")]
    FrameUnavailable(String),
    #[error("item '{0}' is system-owned and cannot be moved")]
    SystemItem(String),
    #[error("no target position could be computed")]
    NoTarget,
    #[error(transparent)]
    Injection(#[from] InjectError),
    #[error("item position did not change after {attempts} attempts")]
    VerificationFailed { attempts: u32 },
}

pub struct Engine<W, I, T> {
    registry: Mutex<ItemRegistry>,
    store: Mutex<SettingsStore>,
    gesture: GestureSimulator<I>,
    windows: W,
    permission: Arc<PermissionGate<T>>,
    emitter: EventEmitter,
    item_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    settle_delay: Duration,
    retry_delay: Duration,
}

impl<W, I, T> Engine<W, I, T>
where
    W: WindowSystem,
    I: InputInjector,
    T: TrustProvider,
{
    pub fn new(
        windows: W,
        gesture: GestureSimulator<I>,
        permission: Arc<PermissionGate<T>>,
        store: SettingsStore,
        emitter: EventEmitter,
    ) -> Self {
        let registry = ItemRegistry::from_configs(store.item_configs());
        Self {
            registry: Mutex::new(registry),
            store: Mutex::new(store),
            gesture,
            windows,
            permission,
            emitter,
            item_locks: StdMutex::new(HashMap::new()),
            settle_delay: SETTLE_DELAY,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Re-snapshot the menu bar, reconcile the registry, persist the result
    /// and notify subscribers.
    pub async fn refresh(&self) -> Vec<ItemInfo> {
        let snapshot = self.windows.status_item_windows();
        let mut registry = self.registry.lock().await;
        registry.merge(snapshot);

        let mut store = self.store.lock().await;
        store.set_item_configs(registry.configs());

        let items = Self::infos(&registry, &store);
        self.emitter.emit_layout_changed(items.clone());
        items
    }

    pub async fn list_items(&self) -> Vec<ItemInfo> {
        let registry = self.registry.lock().await;
        let store = self.store.lock().await;
        Self::infos(&registry, &store)
    }

    pub async fn search(&self, query: &str) -> Vec<ItemInfo> {
        let registry = self.registry.lock().await;
        let store = self.store.lock().await;
        registry
            .search(query)
            .into_iter()
            .map(|i| i.to_info(store.is_hidden(&i.name)))
            .collect()
    }

    pub fn permission_granted(&self) -> bool {
        self.permission.check()
    }

    pub fn request_permission(&self) -> bool {
        self.permission.request()
    }

    /// Drag `name` so it lands at position `index` among the visible items.
    pub async fn move_to_index(&self, name: &str, index: usize) -> Result<(), OpError> {
        self.gate()?;
        let _guard = self.lock_item(name).await;
        self.refresh().await;

        let (source, from) = self.resolve_movable(name).await?;

        let target_x = {
            let registry = self.registry.lock().await;
            let store = self.store.lock().await;
            let mut neighbors: Vec<&MenuBarItem> = registry
                .items()
                .iter()
                .filter(|i| {
                    i.id != source.id && i.frame.is_some() && !store.is_hidden(&i.name)
                })
                .collect();
            neighbors.sort_by(|a, b| {
                a.frame
                    .map(|f| f.min_x())
                    .unwrap_or(f64::MAX)
                    .total_cmp(&b.frame.map(|f| f.min_x()).unwrap_or(f64::MAX))
            });
            core::insertion_target_x(index, &neighbors).ok_or(OpError::NoTarget)?
        };

        self.drag_and_verify(name, from, Point::new(target_x, from.y))
            .await?;
        self.commit_order().await;
        Ok(())
    }

    /// Exchange the positions of two items with two drags.
    pub async fn swap(&self, source: &str, target: &str) -> Result<(), OpError> {
        self.gate()?;
        // Lock in a stable order so two concurrent swaps cannot deadlock
        let (first, second) = if source <= target {
            (source, target)
        } else {
            (target, source)
        };
        let _guard_a = self.lock_item(first).await;
        let _guard_b = if first == second {
            None
        } else {
            Some(self.lock_item(second).await)
        };
        self.refresh().await;

        let (_, source_from) = self.resolve_movable(source).await?;
        let (target_item, target_from) = self.resolve_movable(target).await?;

        let source_dest = core::swap_target(&target_item).ok_or(OpError::NoTarget)?;
        self.drag_and_verify(source, source_from, source_dest)
            .await?;
        self.drag_and_verify(target, target_from, Point::new(source_from.x, target_from.y))
            .await?;
        self.commit_order().await;
        Ok(())
    }

    /// Park an item off-screen to the left, remembering where it was.
    /// A no-op for an item that is already hidden.
    pub async fn hide(&self, name: &str) -> Result<(), OpError> {
        self.gate()?;
        let _guard = self.lock_item(name).await;
        if self.store.lock().await.is_hidden(name) {
            return Ok(());
        }
        self.refresh().await;

        let (item, from) = self.resolve_movable(name).await?;
        let frame = item.frame.ok_or_else(|| OpError::FrameUnavailable(name.to_string()))?;
        let to = core::hide_target(&frame);

        self.drag_and_verify(name, from, to).await?;
        self.store.lock().await.record_hidden(name, from.x);
        Ok(())
    }

    /// Bring a hidden item back, to its recorded position when one exists.
    /// A no-op for an item that is not hidden.
    pub async fn show(&self, name: &str) -> Result<(), OpError> {
        self.gate()?;
        let _guard = self.lock_item(name).await;
        if !self.store.lock().await.is_hidden(name) {
            return Ok(());
        }
        self.refresh().await;

        let (item, from) = self.resolve_movable(name).await?;
        let frame = item.frame.ok_or_else(|| OpError::FrameUnavailable(name.to_string()))?;
        let original = self.store.lock().await.original_position(name);
        let screen = self.windows.main_display_bounds();
        let to = core::show_target(&frame, original, &screen);

        self.drag_and_verify(name, from, to).await?;
        self.store.lock().await.record_shown(name);
        Ok(())
    }

    pub async fn toggle(&self, name: &str) -> Result<(), OpError> {
        let hidden = self.store.lock().await.is_hidden(name);
        if hidden {
            self.show(name).await
        } else {
            self.hide(name).await
        }
    }

    fn gate(&self) -> Result<(), OpError> {
        if self.permission.check() {
            Ok(())
        } else {
            Err(OpError::PermissionDenied)
        }
    }

    async fn lock_item(&self, name: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.item_locks.lock().unwrap();
            // An entry only the map still references has no holder and no
            // waiter, so it can be dropped before admitting the next one.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Look up an item and its drag start point, rejecting system items.
    async fn resolve_movable(&self, name: &str) -> Result<(MenuBarItem, Point), OpError> {
        let registry = self.registry.lock().await;
        let item = registry
            .find(name)
            .ok_or_else(|| OpError::ItemNotFound(name.to_string()))?;
        if item.is_system {
            return Err(OpError::SystemItem(name.to_string()));
        }
        let frame = item
            .frame
            .ok_or_else(|| OpError::FrameUnavailable(name.to_string()))?;
        tracing::debug!(
            "resolved '{}' (window {:?}) at ({:.0}, {:.0})",
            name,
            item.window_id,
            frame.mid_x(),
            frame.mid_y()
        );
        Ok((item.clone(), frame.center()))
    }

    /// Drag from `from` to `to`, retrying until the item's observed position
    /// has moved more than [`MIN_MOVE_DELTA`] from where it started.
    async fn drag_and_verify(&self, name: &str, from: Point, to: Point) -> Result<(), OpError> {
        let mut last_err = OpError::VerificationFailed {
            attempts: MAX_ATTEMPTS,
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match self.gesture.perform_drag(from, to).await {
                Ok(()) => {
                    tokio::time::sleep(self.settle_delay).await;
                    self.refresh().await;

                    let moved = {
                        let registry = self.registry.lock().await;
                        registry
                            .find(name)
                            .and_then(|i| i.frame)
                            .map(|f| (f.mid_x() - from.x).abs() > MIN_MOVE_DELTA)
                            .unwrap_or(false)
                    };
                    if moved {
                        return Ok(());
                    }
                    tracing::warn!(
                        "drag attempt {}/{} for '{}' did not move the item",
                        attempt,
                        MAX_ATTEMPTS,
                        name
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "drag attempt {}/{} for '{}' failed: {}",
                        attempt,
                        MAX_ATTEMPTS,
                        name,
                        e
                    );
                    last_err = OpError::Injection(e);
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(last_err)
    }

    /// Renumber persisted order from the post-drag frames.
    async fn commit_order(&self) {
        let mut registry = self.registry.lock().await;
        registry.reorder_by_position();
        let mut store = self.store.lock().await;
        store.set_item_configs(registry.configs());
        self.emitter.emit_layout_changed(Self::infos(&registry, &store));
    }

    fn infos(registry: &ItemRegistry, store: &SettingsStore) -> Vec<ItemInfo> {
        registry
            .ordered()
            .into_iter()
            .map(|i| i.to_info(store.is_hidden(&i.name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::DragTiming;
    use crate::platform::mock::{MockMenuBar, MockTrust};

    fn test_engine(
        bar: &Arc<MockMenuBar>,
        granted: bool,
        tag: &str,
    ) -> Engine<Arc<MockMenuBar>, Arc<MockMenuBar>, Arc<MockTrust>> {
        let emitter = EventEmitter::new(64);
        let gesture =
            GestureSimulator::with_timing(Arc::clone(bar), DragTiming::immediate());
        let permission = Arc::new(PermissionGate::new(
            Arc::new(MockTrust::new(granted)),
            emitter.clone(),
        ));
        let path = std::env::temp_dir().join(format!(
            "perch-engine-test-{}-{}.json",
            std::process::id(),
            tag
        ));
        let _ = std::fs::remove_file(&path);
        let store = SettingsStore::open(path);

        let mut engine = Engine::new(Arc::clone(bar), gesture, permission, store, emitter);
        engine.settle_delay = Duration::ZERO;
        engine.retry_delay = Duration::ZERO;
        engine
    }

    fn bar_with_items(items: &[(&str, f64)]) -> Arc<MockMenuBar> {
        let bar = Arc::new(MockMenuBar::new());
        for (name, center_x) in items {
            bar.add_item(name, *center_x, 30.0);
        }
        bar
    }

    #[tokio::test]
    async fn test_hide_then_show_restores_original_position() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, true, "hide-show");

        engine.hide("Slack").await.unwrap();
        assert_eq!(bar.item_center_x("Slack"), Some(-100.0));
        assert!(engine.store.lock().await.is_hidden("Slack"));

        engine.show("Slack").await.unwrap();
        assert_eq!(bar.item_center_x("Slack"), Some(300.0));
        assert!(!engine.store.lock().await.is_hidden("Slack"));
        assert_eq!(engine.store.lock().await.original_position("Slack"), None);
    }

    #[tokio::test]
    async fn test_hide_is_idempotent() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, true, "hide-idem");

        engine.hide("Slack").await.unwrap();
        let events_after_first = bar.log().len();

        engine.hide("Slack").await.unwrap();
        assert_eq!(bar.log().len(), events_after_first);
    }

    #[tokio::test]
    async fn test_show_without_hide_is_noop() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, true, "show-noop");

        engine.show("Slack").await.unwrap();
        assert!(bar.log().is_empty());
        assert_eq!(bar.item_center_x("Slack"), Some(300.0));
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, true, "toggle");

        engine.toggle("Slack").await.unwrap();
        assert_eq!(bar.item_center_x("Slack"), Some(-100.0));

        engine.toggle("Slack").await.unwrap();
        assert_eq!(bar.item_center_x("Slack"), Some(300.0));
    }

    #[tokio::test]
    async fn test_idle_item_locks_are_pruned() {
        let bar = bar_with_items(&[("Slack", 300.0), ("Wifi", 500.0)]);
        let engine = test_engine(&bar, true, "lock-prune");

        engine.hide("Slack").await.unwrap();
        engine.hide("Wifi").await.unwrap();

        let locks = engine.item_locks.lock().unwrap();
        assert!(!locks.contains_key("Slack"));
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_ineffective_drags_exhaust_retries() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        bar.set_drags_have_no_effect(true);
        let engine = test_engine(&bar, true, "retries");

        let result = engine.hide("Slack").await;
        assert!(matches!(
            result,
            Err(OpError::VerificationFailed { attempts: 3 })
        ));
        // One press per attempt, and no hidden-state commit
        let presses = bar.log().iter().filter(|e| *e == "button_down").count();
        assert_eq!(presses, 3);
        assert!(!engine.store.lock().await.is_hidden("Slack"));
    }

    #[tokio::test]
    async fn test_injection_failure_surfaces_after_retries() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        bar.fail_event("button_down");
        let engine = test_engine(&bar, true, "inject-fail");

        let result = engine.hide("Slack").await;
        assert!(matches!(result, Err(OpError::Injection(_))));
    }

    #[tokio::test]
    async fn test_system_items_are_rejected() {
        let bar = bar_with_items(&[("Control Center", 300.0), ("Slack", 400.0)]);
        let engine = test_engine(&bar, true, "system");

        let result = engine.hide("Control Center").await;
        assert!(matches!(result, Err(OpError::SystemItem(_))));
        assert!(!bar.log().iter().any(|e| e == "button_down"));

        let result = engine.swap("Slack", "Control Center").await;
        assert!(matches!(result, Err(OpError::SystemItem(_))));
    }

    #[tokio::test]
    async fn test_operations_require_permission() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, false, "permission");

        let result = engine.hide("Slack").await;
        assert!(matches!(result, Err(OpError::PermissionDenied)));
        assert!(bar.log().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_fails_before_any_event() {
        let bar = bar_with_items(&[("Slack", 300.0)]);
        let engine = test_engine(&bar, true, "unknown");

        let result = engine.move_to_index("Discord", 0).await;
        assert!(matches!(result, Err(OpError::ItemNotFound(_))));
        assert!(!bar.log().iter().any(|e| e == "button_down"));
    }

    #[tokio::test]
    async fn test_move_to_front() {
        let bar = bar_with_items(&[("Slack", 100.0), ("Clock", 200.0), ("Wifi", 300.0)]);
        let engine = test_engine(&bar, true, "move");

        engine.move_to_index("Wifi", 0).await.unwrap();

        // Dropped just left of Slack's frame (min_x 85, gap 5)
        assert_eq!(bar.item_center_x("Wifi"), Some(80.0));
        let items = engine.list_items().await;
        assert_eq!(items[0].name, "Wifi");
    }

    #[tokio::test]
    async fn test_swap_exchanges_positions() {
        let bar = bar_with_items(&[("Slack", 100.0), ("Wifi", 300.0)]);
        let engine = test_engine(&bar, true, "swap");

        engine.swap("Slack", "Wifi").await.unwrap();

        assert_eq!(bar.item_center_x("Slack"), Some(300.0));
        assert_eq!(bar.item_center_x("Wifi"), Some(100.0));
        let items = engine.list_items().await;
        assert_eq!(items[0].name, "Wifi");
        assert_eq!(items[1].name, "Slack");
    }
}
