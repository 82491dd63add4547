use crate::platform::{is_system_owner, RawWindow};

use super::{ItemConfig, ItemId, MenuBarItem};

/// The ordered list of known menu bar items, reconciled against window
/// server snapshots.
pub struct ItemRegistry {
    items: Vec<MenuBarItem>,
    next_id: ItemId,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Restore a registry from persisted configurations. Items start without
    /// frames; the first merge fills them in.
    pub fn from_configs(configs: Vec<ItemConfig>) -> Self {
        let next_id = configs.iter().map(|c| c.id + 1).max().unwrap_or(1);
        Self {
            items: configs.into_iter().map(ItemConfig::into_item).collect(),
            next_id,
        }
    }

    pub fn items(&self) -> &[MenuBarItem] {
        &self.items
    }

    /// Items sorted by user-intended order. The sort is stable, so items with
    /// equal order (or degenerate identical frames) keep snapshot order.
    pub fn ordered(&self) -> Vec<&MenuBarItem> {
        let mut ordered: Vec<&MenuBarItem> = self.items.iter().collect();
        ordered.sort_by_key(|i| i.order);
        ordered
    }

    pub fn find(&self, name: &str) -> Option<&MenuBarItem> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Reconcile against a fresh snapshot. Matched items (by name or bundle
    /// id) keep their identity and order and get all transient fields
    /// overwritten; unmatched records mint a new identity with order set to
    /// append at the end of this refresh's output.
    pub fn merge(&mut self, snapshot: Vec<RawWindow>) {
        let mut merged: Vec<MenuBarItem> = Vec::with_capacity(snapshot.len());

        for raw in snapshot {
            let existing = self
                .items
                .iter()
                .find(|i| i.matches(&raw.owner_name, raw.bundle_id.as_deref()));

            let (id, order) = match existing {
                Some(item) => (item.id, item.order),
                None => (self.mint_id(), merged.len()),
            };

            merged.push(MenuBarItem {
                id,
                is_system: is_system_owner(&raw.owner_name),
                name: raw.owner_name,
                bundle_id: raw.bundle_id,
                order,
                frame: Some(raw.bounds),
                window_id: Some(raw.window_id),
                owner_pid: Some(raw.owner_pid),
            });
        }

        tracing::debug!("registry refreshed: {} items", merged.len());
        self.items = merged;
    }

    /// Case-insensitive substring filter. An empty query returns every item
    /// in its current order.
    pub fn search(&self, query: &str) -> Vec<&MenuBarItem> {
        if query.is_empty() {
            return self.items.iter().collect();
        }
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Renumber `order` from current on-screen positions, left to right.
    /// Items without a frame sink to the end, keeping their relative order.
    /// Called after a verified move so the persisted order tracks reality.
    pub fn reorder_by_position(&mut self) {
        let mut ranked: Vec<usize> = (0..self.items.len()).collect();
        ranked.sort_by(|&a, &b| {
            let ax = self.items[a].frame.map(|f| f.min_x());
            let bx = self.items[b].frame.map(|f| f.min_x());
            match (ax, bx) {
                (Some(ax), Some(bx)) => ax.total_cmp(&bx),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        for (order, index) in ranked.into_iter().enumerate() {
            self.items[index].order = order;
        }
    }

    pub fn configs(&self) -> Vec<ItemConfig> {
        self.items.iter().map(ItemConfig::from).collect()
    }

    fn mint_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for ItemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::raw_window;
    use crate::platform::STATUS_WINDOW_LEVEL;

    fn snapshot(names: &[&str]) -> Vec<RawWindow> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                raw_window(
                    name,
                    i as u32 + 1,
                    STATUS_WINDOW_LEVEL,
                    100.0 * (i as f64 + 1.0),
                    30.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_merge_keeps_order_across_snapshot_reordering() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack", "Clock", "Wifi"]));
        let slack_order = registry.find("Slack").unwrap().order;
        let wifi_order = registry.find("Wifi").unwrap().order;

        // Same owners, different snapshot positions
        registry.merge(snapshot(&["Wifi", "Slack", "Clock"]));
        assert_eq!(registry.find("Slack").unwrap().order, slack_order);
        assert_eq!(registry.find("Wifi").unwrap().order, wifi_order);
    }

    #[test]
    fn test_merge_appends_new_items() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack", "Clock"]));
        registry.merge(snapshot(&["Slack", "Clock", "Wifi"]));

        assert_eq!(registry.find("Wifi").unwrap().order, 2);
    }

    #[test]
    fn test_merge_preserves_identity_by_name() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack"]));
        let id = registry.find("Slack").unwrap().id;

        registry.merge(snapshot(&["Slack"]));
        assert_eq!(registry.find("Slack").unwrap().id, id);
    }

    #[test]
    fn test_merge_mints_new_identity_for_unknown_name() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack"]));
        let slack_id = registry.find("Slack").unwrap().id;

        registry.merge(snapshot(&["Discord"]));
        let discord = registry.find("Discord").unwrap();
        assert_ne!(discord.id, slack_id);
        assert_eq!(discord.order, 0);
        assert!(registry.find("Slack").is_none());
    }

    #[test]
    fn test_merge_matches_by_bundle_id_when_name_changes() {
        let mut registry = ItemRegistry::new();
        let mut first = raw_window("Slack", 1, STATUS_WINDOW_LEVEL, 100.0, 30.0);
        first.bundle_id = Some("com.tinyspeck.slackmacgap".to_string());
        registry.merge(vec![first]);
        let id = registry.find("Slack").unwrap().id;

        let mut renamed = raw_window("Slack Beta", 2, STATUS_WINDOW_LEVEL, 100.0, 30.0);
        renamed.bundle_id = Some("com.tinyspeck.slackmacgap".to_string());
        registry.merge(vec![renamed]);
        assert_eq!(registry.find("Slack Beta").unwrap().id, id);
    }

    #[test]
    fn test_merge_overwrites_transient_fields() {
        let mut registry = ItemRegistry::new();
        registry.merge(vec![raw_window(
            "Slack",
            1,
            STATUS_WINDOW_LEVEL,
            100.0,
            30.0,
        )]);
        registry.merge(vec![raw_window(
            "Slack",
            9,
            STATUS_WINDOW_LEVEL,
            400.0,
            30.0,
        )]);

        let item = registry.find("Slack").unwrap();
        assert_eq!(item.window_id, Some(9));
        assert_eq!(item.frame.unwrap().x, 400.0);
    }

    #[test]
    fn test_empty_snapshot_empties_registry() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack"]));
        registry.merge(Vec::new());
        assert!(registry.items().is_empty());
    }

    #[test]
    fn test_system_items_classified_on_merge() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Control Center", "Slack"]));
        assert!(registry.find("Control Center").unwrap().is_system);
        assert!(!registry.find("Slack").unwrap().is_system);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack", "Clock", "Control Center"]));

        let hits = registry.search("cLoCk");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Clock");

        let all = registry.search("");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_reorder_by_position_follows_frames() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack", "Clock", "Wifi"]));

        // Wifi dragged to the far left
        let mut moved = snapshot(&["Slack", "Clock", "Wifi"]);
        moved[2].bounds.x = 10.0;
        registry.merge(moved);
        registry.reorder_by_position();

        assert_eq!(registry.find("Wifi").unwrap().order, 0);
        assert_eq!(registry.find("Slack").unwrap().order, 1);
        assert_eq!(registry.find("Clock").unwrap().order, 2);
    }

    #[test]
    fn test_from_configs_continues_id_sequence() {
        let mut registry = ItemRegistry::new();
        registry.merge(snapshot(&["Slack", "Clock"]));
        let configs = registry.configs();
        let max_id = configs.iter().map(|c| c.id).max().unwrap();

        let mut restored = ItemRegistry::from_configs(configs);
        restored.merge(snapshot(&["Slack", "Clock", "Wifi"]));
        assert!(restored.find("Wifi").unwrap().id > max_id);
    }
}
