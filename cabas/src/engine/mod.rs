//! The OS seam. Everything the engine knows about the desktop comes
//! through [`DesktopEngine`]; the rest of the crate is pure orchestration
//! over this trait, which keeps the login flow testable against a scripted
//! implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::errors::AutomationError;
use crate::geometry::{Point, Region};

pub mod native;

/// Read-only observation of a top-level window at one instant. Windows are
/// identified by title, not by a stable handle, so a snapshot goes stale
/// the moment the target redraws; re-resolve before any region-constrained
/// use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub id: u32,
    pub pid: u32,
    pub title: String,
    pub region: Region,
    pub visible: bool,
    pub maximized: bool,
}

impl WindowSnapshot {
    pub fn center(&self) -> Point {
        self.region.center()
    }
}

/// One row of the OS process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub exe_path: Option<PathBuf>,
}

/// One recognized word with its box in the coordinates of the image it was
/// recognized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub region: Region,
    pub confidence: f32,
}

impl OcrWord {
    pub fn center(&self) -> Point {
        self.region.center()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keys the engine can synthesize. `Control` only appears inside chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Control,
    Char(char),
}

/// Raw desktop capabilities: enumeration, capture, recognition, input and
/// process control. Implementations must not retry or absorb failures;
/// policy lives in the layers above.
pub trait DesktopEngine: Send + Sync {
    fn list_windows(&self) -> Result<Vec<WindowSnapshot>, AutomationError>;

    /// Primary monitor dimensions in pixels.
    fn screen_size(&self) -> Result<(u32, u32), AutomationError>;

    fn capture_screen(&self) -> Result<RgbaImage, AutomationError>;

    /// Captures `region`, clipped to the primary monitor.
    fn capture_region(&self, region: Region) -> Result<RgbaImage, AutomationError>;

    /// Word-level OCR over an already captured image. Box coordinates are
    /// local to that image.
    fn recognize_words(&self, image: &RgbaImage) -> Result<Vec<OcrWord>, AutomationError>;

    fn cursor_position(&self) -> Result<Point, AutomationError>;

    fn mouse_click(
        &self,
        at: Point,
        button: MouseButton,
        double: bool,
    ) -> Result<(), AutomationError>;

    /// Emits `text` into whatever currently holds focus.
    fn type_text(&self, text: &str) -> Result<(), AutomationError>;

    fn press_key(&self, key: KeyPress) -> Result<(), AutomationError>;

    /// Presses `keys` in order and releases them in reverse order.
    fn press_chord(&self, keys: &[KeyPress]) -> Result<(), AutomationError>;

    fn activate_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError>;

    fn maximize_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError>;

    fn close_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError>;

    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AutomationError>;

    /// Spawns the executable detached and returns its pid. The spawned
    /// process may immediately hand off to another one, so callers track
    /// the target by scanning the process table, not by this pid alone.
    fn spawn_process(&self, path: &Path) -> Result<u32, AutomationError>;

    /// Asks a process to exit, or kills it outright when `force` is set.
    fn terminate_process(&self, pid: u32, force: bool) -> Result<(), AutomationError>;
}

/// Builds the production engine for the current desktop.
pub fn create_engine(ocr_language: &str) -> Result<Arc<dyn DesktopEngine>, AutomationError> {
    Ok(Arc::new(native::NativeEngine::new(ocr_language)?))
}
