//! Synthetic command-drag gestures.
//!
//! The window server only repositions a status item for a drag that looks
//! like a real one: pointer warped to the item, command held, button pressed,
//! a train of drag events, then release. Timing matters; events fired
//! back-to-back are treated as a flick and dropped.

use std::time::Duration;

use crate::platform::{InjectError, InputInjector, Point};

/// macOS virtual keycode for the left command key.
pub const COMMAND_KEYCODE: u16 = 0x37;

/// Number of interpolated drag events between the start and end points.
const DRAG_STEPS: u32 = 12;

/// Inter-event delays. The defaults are empirical; tests zero them out.
#[derive(Debug, Clone, Copy)]
pub struct DragTiming {
    /// After warping the pointer to the start or end point.
    pub warp_settle: Duration,
    /// After pressing or releasing the command key.
    pub modifier_settle: Duration,
    /// After pressing the button.
    pub press_settle: Duration,
    /// Between interpolated drag events.
    pub step_interval: Duration,
}

impl Default for DragTiming {
    fn default() -> Self {
        Self {
            warp_settle: Duration::from_millis(50),
            modifier_settle: Duration::from_millis(30),
            press_settle: Duration::from_millis(50),
            step_interval: Duration::from_millis(25),
        }
    }
}

impl DragTiming {
    /// No delays at all, for tests.
    pub fn immediate() -> Self {
        Self {
            warp_settle: Duration::ZERO,
            modifier_settle: Duration::ZERO,
            press_settle: Duration::ZERO,
            step_interval: Duration::ZERO,
        }
    }
}

pub struct GestureSimulator<I> {
    injector: I,
    timing: DragTiming,
}

impl<I: InputInjector> GestureSimulator<I> {
    pub fn new(injector: I) -> Self {
        Self::with_timing(injector, DragTiming::default())
    }

    pub fn with_timing(injector: I, timing: DragTiming) -> Self {
        Self { injector, timing }
    }

    /// Perform a command-drag from `from` to `to`, restoring the pointer to
    /// its pre-operation location afterwards.
    ///
    /// If any event fails mid-sequence the button and the command key are
    /// still released before the error is returned; a stuck modifier would
    /// leave the whole session unusable.
    pub async fn perform_drag(&self, from: Point, to: Point) -> Result<(), InjectError> {
        let restore = self.injector.pointer_location();

        let result = self.drag_sequence(from, to).await;
        if let Err(e) = &result {
            tracing::warn!("drag aborted mid-sequence: {}, releasing inputs", e);
            let _ = self.injector.button_up(to);
            let _ = self.injector.key_up(COMMAND_KEYCODE);
        }

        let _ = self.injector.warp_pointer(restore);
        result
    }

    async fn drag_sequence(&self, from: Point, to: Point) -> Result<(), InjectError> {
        tracing::debug!(
            "dragging from ({:.0}, {:.0}) to ({:.0}, {:.0})",
            from.x,
            from.y,
            to.x,
            to.y
        );

        self.injector.warp_pointer(from)?;
        tokio::time::sleep(self.timing.warp_settle).await;

        self.injector.key_down(COMMAND_KEYCODE)?;
        tokio::time::sleep(self.timing.modifier_settle).await;

        self.injector.button_down(from)?;
        tokio::time::sleep(self.timing.press_settle).await;

        for step in 1..=DRAG_STEPS {
            let progress = f64::from(step) / f64::from(DRAG_STEPS);
            let current = Point::new(
                from.x + (to.x - from.x) * progress,
                from.y + (to.y - from.y) * progress,
            );
            self.injector.warp_pointer(current)?;
            self.injector.drag_to(current)?;
            tokio::time::sleep(self.timing.step_interval).await;
        }

        self.injector.warp_pointer(to)?;
        tokio::time::sleep(self.timing.warp_settle).await;

        self.injector.button_up(to)?;
        tokio::time::sleep(self.timing.modifier_settle).await;

        self.injector.key_up(COMMAND_KEYCODE)?;
        Ok(())
    }
}
