//! Synthetic CGEvent posting for drags.
//!
//! Events go to the HID tap so they behave exactly like hardware input, and
//! mouse events carry the command flag so the window server treats the drag
//! as a status-item rearrangement.

use core_graphics::display::CGWarpMouseCursorPosition;
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTapLocation, CGEventType, CGMouseButton,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use crate::platform::{InjectError, Point};

fn source() -> Result<CGEventSource, InjectError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| InjectError("source"))
}

pub fn warp_pointer(to: Point) -> Result<(), InjectError> {
    let result = unsafe { CGWarpMouseCursorPosition(CGPoint::new(to.x, to.y)) };
    if result != 0 {
        return Err(InjectError("warp"));
    }
    Ok(())
}

pub fn post_key(keycode: u16, down: bool) -> Result<(), InjectError> {
    let kind = if down { "key_down" } else { "key_up" };
    let event =
        CGEvent::new_keyboard_event(source()?, keycode, down).map_err(|_| InjectError(kind))?;
    event.post(CGEventTapLocation::HID);
    Ok(())
}

pub fn post_mouse(event_type: CGEventType, at: Point) -> Result<(), InjectError> {
    let event = CGEvent::new_mouse_event(
        source()?,
        event_type,
        CGPoint::new(at.x, at.y),
        CGMouseButton::Left,
    )
    .map_err(|_| InjectError("mouse"))?;
    event.set_flags(CGEventFlags::CGEventFlagCommand);
    event.post(CGEventTapLocation::HID);
    Ok(())
}

pub fn pointer_location() -> Point {
    let location = source()
        .ok()
        .and_then(|s| CGEvent::new(s).ok())
        .map(|e| e.location());
    match location {
        Some(p) => Point::new(p.x, p.y),
        None => Point::default(),
    }
}
