use core_graphics::display::{CGDisplayBounds, CGMainDisplayID};

use crate::platform::Bounds;

/// Bounds of the main display in global (top-left origin) coordinates.
pub fn main_display_bounds() -> Bounds {
    let rect = unsafe { CGDisplayBounds(CGMainDisplayID()) };
    Bounds {
        x: rect.origin.x,
        y: rect.origin.y,
        width: rect.size.width,
        height: rect.size.height,
    }
}
