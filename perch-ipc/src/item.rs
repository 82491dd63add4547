use serde::{Deserialize, Serialize};

/// A menu bar item as reported by the daemon.
///
/// Frame fields are only present when the item's status window was found in
/// the most recent snapshot; a hidden item parked off-screen still reports a
/// frame (with a negative x) as long as its window exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: u64,
    pub name: String,
    pub bundle_id: Option<String>,
    pub pid: Option<i32>,
    pub order: usize,
    pub is_system: bool,
    pub is_hidden: bool,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}
