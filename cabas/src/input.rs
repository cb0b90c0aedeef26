//! Guarded input primitives.
//!
//! Every dispatch goes through the same gate: an optional corner failsafe
//! (parking the physical cursor in a screen corner aborts the run) and a
//! fixed pause so the sluggish target client can keep up. Clicks are
//! clamped into the screen because strategy tables produce coordinates
//! from arithmetic on possibly stale rectangles.

use std::sync::Arc;
use std::thread;

use tracing::{debug, instrument};

use crate::config::Timing;
use crate::engine::{DesktopEngine, KeyPress, MouseButton};
use crate::errors::AutomationError;
use crate::geometry::Point;

pub struct ActionDriver {
    engine: Arc<dyn DesktopEngine>,
    timing: Timing,
    failsafe: bool,
}

impl ActionDriver {
    pub fn new(engine: Arc<dyn DesktopEngine>, timing: Timing, failsafe: bool) -> Self {
        Self {
            engine,
            timing,
            failsafe,
        }
    }

    /// Single left click at `at`, clamped into the screen.
    pub fn click(&self, at: Point) -> Result<(), AutomationError> {
        self.click_with(at, MouseButton::Left, false)
    }

    #[instrument(skip(self))]
    pub fn click_with(
        &self,
        at: Point,
        button: MouseButton,
        double: bool,
    ) -> Result<(), AutomationError> {
        self.guard()?;
        let (width, height) = self.engine.screen_size()?;
        let clamped = at.clamped_to(width, height);
        if clamped != at {
            debug!(requested = ?at, ?clamped, "click clamped into screen bounds");
        }
        self.engine.mouse_click(clamped, button, double)?;
        // Let the UI settle before whatever comes next.
        thread::sleep(self.timing.short_wait());
        Ok(())
    }

    /// Types into whichever control has focus. `slow` emits one character
    /// per tick for input-lag-sensitive fields.
    #[instrument(skip(self, text))]
    pub fn type_text(
        &self,
        text: &str,
        clear_first: bool,
        slow: bool,
    ) -> Result<(), AutomationError> {
        if clear_first {
            self.clear_field()?;
        }
        if slow {
            for c in text.chars() {
                self.guard()?;
                self.engine.type_text(&c.to_string())?;
                thread::sleep(self.timing.inter_key());
            }
        } else {
            self.guard()?;
            self.engine.type_text(text)?;
        }
        Ok(())
    }

    /// Select-all, delete, backspace. The target clears text reliably on
    /// none of these individually, so all three are sent.
    pub fn clear_field(&self) -> Result<(), AutomationError> {
        self.select_all()?;
        self.press(KeyPress::Delete)?;
        self.press(KeyPress::Backspace)?;
        Ok(())
    }

    pub fn select_all(&self) -> Result<(), AutomationError> {
        self.guard()?;
        self.engine
            .press_chord(&[KeyPress::Control, KeyPress::Char('a')])
    }

    pub fn press(&self, key: KeyPress) -> Result<(), AutomationError> {
        self.guard()?;
        self.engine.press_key(key)
    }

    /// Failsafe check, then the fixed inter-action pause.
    fn guard(&self) -> Result<(), AutomationError> {
        if self.failsafe {
            match (self.engine.cursor_position(), self.engine.screen_size()) {
                (Ok(cursor), Ok((width, height))) if in_corner(cursor, width, height) => {
                    return Err(AutomationError::InputAborted(format!(
                        "cursor parked in screen corner at {},{}",
                        cursor.x, cursor.y
                    )));
                }
                _ => {}
            }
        }
        thread::sleep(self.timing.action_pause());
        Ok(())
    }
}

/// True when the cursor sits in any screen corner. A small margin makes
/// the abort gesture forgiving of cursor jitter.
fn in_corner(p: Point, width: u32, height: u32) -> bool {
    const MARGIN: i32 = 2;
    let right = width as i32 - 1;
    let bottom = height as i32 - 1;
    let near = |v: i32, edge: i32| (v - edge).abs() <= MARGIN;
    (near(p.x, 0) || near(p.x, right)) && (near(p.y, 0) || near(p.y, bottom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_trigger_the_failsafe() {
        assert!(in_corner(Point::new(0, 0), 1920, 1080));
        assert!(in_corner(Point::new(1919, 0), 1920, 1080));
        assert!(in_corner(Point::new(0, 1079), 1920, 1080));
        assert!(in_corner(Point::new(1918, 1078), 1920, 1080));
    }

    #[test]
    fn edges_and_center_do_not() {
        assert!(!in_corner(Point::new(960, 540), 1920, 1080));
        assert!(!in_corner(Point::new(0, 540), 1920, 1080));
        assert!(!in_corner(Point::new(960, 0), 1920, 1080));
    }
}
