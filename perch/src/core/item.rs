use perch_ipc::ItemInfo;
use serde::{Deserialize, Serialize};

use crate::platform::Bounds;

pub type ItemId = u64;

/// One status bar entry.
///
/// Identity is the generated `id`, which survives refreshes as long as the
/// item can be re-matched by name or bundle id. The window-derived fields are
/// transient: rebuilt from every snapshot, never persisted, and absent when
/// the item's window was not found.
#[derive(Debug, Clone)]
pub struct MenuBarItem {
    pub id: ItemId,
    pub name: String,
    pub bundle_id: Option<String>,
    /// User-intended position, persisted across runs.
    pub order: usize,
    /// OS-owned chrome; never a move or hide target.
    pub is_system: bool,
    pub frame: Option<Bounds>,
    pub window_id: Option<u32>,
    pub owner_pid: Option<i32>,
}

impl MenuBarItem {
    /// Join predicate used when reconciling against a fresh snapshot: the
    /// owner name is the natural key, the bundle id a secondary one.
    pub fn matches(&self, name: &str, bundle_id: Option<&str>) -> bool {
        if self.name == name {
            return true;
        }
        match (&self.bundle_id, bundle_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn to_info(&self, is_hidden: bool) -> ItemInfo {
        ItemInfo {
            id: self.id,
            name: self.name.clone(),
            bundle_id: self.bundle_id.clone(),
            pid: self.owner_pid,
            order: self.order,
            is_system: self.is_system,
            is_hidden,
            x: self.frame.map(|f| f.x),
            y: self.frame.map(|f| f.y),
            width: self.frame.map(|f| f.width),
            height: self.frame.map(|f| f.height),
        }
    }
}

/// The persisted slice of an item: everything except the transient
/// window-derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub bundle_id: Option<String>,
    pub order: usize,
    pub is_system: bool,
}

impl From<&MenuBarItem> for ItemConfig {
    fn from(item: &MenuBarItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            bundle_id: item.bundle_id.clone(),
            order: item.order,
            is_system: item.is_system,
        }
    }
}

impl ItemConfig {
    /// Rebuild a frame-less item, used when loading persisted state before
    /// the first snapshot arrives.
    pub fn into_item(self) -> MenuBarItem {
        MenuBarItem {
            id: self.id,
            name: self.name,
            bundle_id: self.bundle_id,
            order: self.order,
            is_system: self.is_system,
            frame: None,
            window_id: None,
            owner_pid: None,
        }
    }
}
