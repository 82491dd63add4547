use std::sync::Arc;

/// A point in global screen coordinates (origin at the top-left of the main
/// display, y growing downwards, matching the window server).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// One raw window record from the window server.
#[derive(Debug, Clone)]
pub struct RawWindow {
    pub owner_name: String,
    pub owner_pid: i32,
    pub window_id: u32,
    pub layer: i32,
    pub bounds: Bounds,
    pub bundle_id: Option<String>,
}

/// Window level of the menu bar itself.
pub const MAIN_MENU_WINDOW_LEVEL: i32 = 24;
/// Window level of individual status items.
pub const STATUS_WINDOW_LEVEL: i32 = 25;

/// Window-server chrome that must never be offered for management.
const SKIPPED_OWNERS: &[&str] = &["Window Server", "Dock"];

/// Owners whose items are OS chrome: listed, but never moved or hidden.
const SYSTEM_OWNERS: &[&str] = &["SystemUIServer", "Control Center"];

pub fn is_system_owner(name: &str) -> bool {
    SYSTEM_OWNERS.contains(&name)
}

/// Select the manageable status item windows out of a raw on-screen window
/// list: status-bar layers only, known chrome skipped, one window per owner
/// name (first occurrence wins).
pub fn select_status_items(records: Vec<RawWindow>) -> Vec<RawWindow> {
    let mut selected: Vec<RawWindow> = Vec::new();

    for record in records {
        if record.layer != STATUS_WINDOW_LEVEL && record.layer != MAIN_MENU_WINDOW_LEVEL {
            continue;
        }
        if SKIPPED_OWNERS.contains(&record.owner_name.as_str()) {
            continue;
        }
        if selected.iter().any(|r| r.owner_name == record.owner_name) {
            continue;
        }
        selected.push(record);
    }

    selected
}

/// Trait for querying status item windows and screen geometry.
/// This abstraction allows mocking in tests.
pub trait WindowSystem {
    /// Current on-screen status bar windows, filtered and deduplicated.
    /// Returns an empty list (never an error) when the permission required to
    /// read window metadata is missing.
    fn status_item_windows(&self) -> Vec<RawWindow>;

    /// Bounds of the main display in global coordinates.
    fn main_display_bounds(&self) -> Bounds;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("failed to post {0} event")]
pub struct InjectError(pub &'static str);

/// Trait for posting synthetic input events.
/// All methods are fallible because the OS may refuse to construct or post
/// events for an untrusted process. Mouse events carry the command modifier
/// flag, which is what lets status items be dragged.
pub trait InputInjector {
    fn warp_pointer(&self, to: Point) -> Result<(), InjectError>;
    fn key_down(&self, keycode: u16) -> Result<(), InjectError>;
    fn key_up(&self, keycode: u16) -> Result<(), InjectError>;
    fn button_down(&self, at: Point) -> Result<(), InjectError>;
    fn drag_to(&self, at: Point) -> Result<(), InjectError>;
    fn button_up(&self, at: Point) -> Result<(), InjectError>;
    fn pointer_location(&self) -> Point;
}

/// Trait for querying and requesting accessibility trust.
pub trait TrustProvider {
    fn is_trusted(&self) -> bool;
    /// Trigger the OS consent prompt. Returns whether trust was already
    /// granted; there is no callback for a later grant, callers must poll.
    fn request_trust(&self) -> bool;
}

impl<T: WindowSystem> WindowSystem for Arc<T> {
    fn status_item_windows(&self) -> Vec<RawWindow> {
        (**self).status_item_windows()
    }

    fn main_display_bounds(&self) -> Bounds {
        (**self).main_display_bounds()
    }
}

impl<T: InputInjector> InputInjector for Arc<T> {
    fn warp_pointer(&self, to: Point) -> Result<(), InjectError> {
        (**self).warp_pointer(to)
    }

    fn key_down(&self, keycode: u16) -> Result<(), InjectError> {
        (**self).key_down(keycode)
    }

    fn key_up(&self, keycode: u16) -> Result<(), InjectError> {
        (**self).key_up(keycode)
    }

    fn button_down(&self, at: Point) -> Result<(), InjectError> {
        (**self).button_down(at)
    }

    fn drag_to(&self, at: Point) -> Result<(), InjectError> {
        (**self).drag_to(at)
    }

    fn button_up(&self, at: Point) -> Result<(), InjectError> {
        (**self).button_up(at)
    }

    fn pointer_location(&self) -> Point {
        (**self).pointer_location()
    }
}

impl<T: TrustProvider> TrustProvider for Arc<T> {
    fn is_trusted(&self) -> bool {
        (**self).is_trusted()
    }

    fn request_trust(&self) -> bool {
        (**self).request_trust()
    }
}

/// macOS implementation of WindowSystem
#[cfg(target_os = "macos")]
pub struct MacWindowSystem;

#[cfg(target_os = "macos")]
impl WindowSystem for MacWindowSystem {
    fn status_item_windows(&self) -> Vec<RawWindow> {
        // Silent degradation: without trust the window list has no usable
        // owner metadata, so report an empty bar rather than an error.
        if !crate::macos::is_trusted() {
            return Vec::new();
        }
        select_status_items(crate::macos::raw_on_screen_windows())
    }

    fn main_display_bounds(&self) -> Bounds {
        crate::macos::main_display_bounds()
    }
}

/// macOS implementation of InputInjector backed by CGEvent
#[cfg(target_os = "macos")]
pub struct MacInputInjector;

#[cfg(target_os = "macos")]
impl InputInjector for MacInputInjector {
    fn warp_pointer(&self, to: Point) -> Result<(), InjectError> {
        crate::macos::warp_pointer(to)
    }

    fn key_down(&self, keycode: u16) -> Result<(), InjectError> {
        crate::macos::post_key(keycode, true)
    }

    fn key_up(&self, keycode: u16) -> Result<(), InjectError> {
        crate::macos::post_key(keycode, false)
    }

    fn button_down(&self, at: Point) -> Result<(), InjectError> {
        crate::macos::post_mouse(core_graphics::event::CGEventType::LeftMouseDown, at)
    }

    fn drag_to(&self, at: Point) -> Result<(), InjectError> {
        crate::macos::post_mouse(core_graphics::event::CGEventType::LeftMouseDragged, at)
    }

    fn button_up(&self, at: Point) -> Result<(), InjectError> {
        crate::macos::post_mouse(core_graphics::event::CGEventType::LeftMouseUp, at)
    }

    fn pointer_location(&self) -> Point {
        crate::macos::pointer_location()
    }
}

/// macOS implementation of TrustProvider
#[cfg(target_os = "macos")]
pub struct MacTrustProvider;

#[cfg(target_os = "macos")]
impl TrustProvider for MacTrustProvider {
    fn is_trusted(&self) -> bool {
        crate::macos::is_trusted()
    }

    fn request_trust(&self) -> bool {
        crate::macos::is_trusted_with_prompt()
    }
}
