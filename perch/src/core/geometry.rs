//! Pure target-coordinate computations for item drags.
//!
//! Every function returns `None` when a required frame is unavailable;
//! callers must treat that as operation failure rather than a position.

use crate::platform::{Bounds, Point};

use super::MenuBarItem;

/// Horizontal gap used when inserting before the first or after the last item.
const EDGE_GAP: f64 = 5.0;

/// X coordinate items are parked at when hidden (off-screen left).
pub const HIDDEN_X: f64 = -100.0;

/// Distance from the right screen edge used when restoring an item that has
/// no recorded original position.
pub const RESTORE_FALLBACK_MARGIN: f64 = 100.0;

/// Target X for inserting an item at `index` within the displayed order.
/// Index 0 inserts before the first item, `ordered.len()` after the last,
/// anything in between lands on the midpoint between the two neighbors.
pub fn insertion_target_x(index: usize, ordered: &[&MenuBarItem]) -> Option<f64> {
    if ordered.is_empty() {
        return None;
    }

    if index == 0 {
        let frame = ordered.first()?.frame?;
        return Some(frame.min_x() - EDGE_GAP);
    }

    if index >= ordered.len() {
        let frame = ordered.last()?.frame?;
        return Some(frame.max_x() + EDGE_GAP);
    }

    let before = ordered[index - 1].frame?;
    let after = ordered[index].frame?;
    Some((before.max_x() + after.min_x()) / 2.0)
}

/// Target point for swapping with `target`: its current center.
pub fn swap_target(target: &MenuBarItem) -> Option<Point> {
    target.frame.map(|f| f.center())
}

/// Target point for parking an item off-screen; Y is unchanged.
pub fn hide_target(frame: &Bounds) -> Point {
    Point::new(HIDDEN_X, frame.mid_y())
}

/// Target point for restoring a hidden item. Falls back to a spot near the
/// right screen edge when no original position was recorded.
pub fn show_target(frame: &Bounds, original_x: Option<f64>, screen: &Bounds) -> Point {
    let x = original_x.unwrap_or(screen.x + screen.width - RESTORE_FALLBACK_MARGIN);
    Point::new(x, frame.mid_y())
}
