//! Production [`DesktopEngine`] backed by xcap (windows, monitors,
//! capture), enigo (input synthesis), sysinfo (process table) and
//! tesseract (OCR).
//!
//! Window management here is deliberately input-driven: the target ships
//! no automation interface, so raising a window is a title-bar click and
//! maximizing is a title-bar double-click. Callers treat both as
//! best-effort.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::RgbaImage;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::debug;

use super::{DesktopEngine, KeyPress, MouseButton, OcrWord, ProcessInfo, WindowSnapshot};
use crate::errors::AutomationError;
use crate::geometry::{Point, Region};

/// Maximized windows overhang their monitor by the border width, so the
/// geometric check allows this many pixels of slack per edge.
const MAXIMIZE_TOLERANCE: i32 = 32;

/// Vertical offset into the title bar when clicking it.
const TITLE_BAR_INSET: i32 = 12;

pub struct NativeEngine {
    input: Mutex<Enigo>,
    system: Mutex<System>,
    ocr_language: String,
}

impl NativeEngine {
    pub fn new(ocr_language: &str) -> Result<Self, AutomationError> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| {
            AutomationError::PlatformError(format!("failed to initialize input backend: {e}"))
        })?;
        Ok(Self {
            input: Mutex::new(enigo),
            system: Mutex::new(System::new()),
            ocr_language: ocr_language.to_string(),
        })
    }

    fn input(&self) -> Result<MutexGuard<'_, Enigo>, AutomationError> {
        self.input
            .lock()
            .map_err(|_| AutomationError::PlatformError("input backend lock poisoned".to_string()))
    }

    fn primary_monitor() -> Result<xcap::Monitor, AutomationError> {
        let monitors = xcap::Monitor::all().map_err(|e| {
            AutomationError::PlatformError(format!("failed to enumerate monitors: {e}"))
        })?;
        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
        fallback.ok_or_else(|| AutomationError::PlatformError("no monitors detected".to_string()))
    }

    fn monitor_regions() -> Vec<Region> {
        let monitors = match xcap::Monitor::all() {
            Ok(monitors) => monitors,
            Err(e) => {
                debug!("failed to enumerate monitors: {e}");
                return Vec::new();
            }
        };
        let mut regions = Vec::new();
        for monitor in monitors {
            match (monitor.x(), monitor.y(), monitor.width(), monitor.height()) {
                (Ok(x), Ok(y), Ok(width), Ok(height)) => {
                    regions.push(Region::new(x, y, width, height))
                }
                _ => debug!("skipping monitor with unreadable bounds"),
            }
        }
        regions
    }

    /// Extracts a snapshot from one enumerated window, skipping it (with a
    /// debug log) when any property cannot be read mid-teardown.
    fn snapshot_window(window: &xcap::Window, monitors: &[Region]) -> Option<WindowSnapshot> {
        let id = match window.id() {
            Ok(id) => id,
            Err(e) => {
                debug!("skipping window without id: {e}");
                return None;
            }
        };
        let pid = match window.pid() {
            Ok(pid) => pid,
            Err(e) => {
                debug!(window_id = id, "skipping window without pid: {e}");
                return None;
            }
        };
        let title = match window.title() {
            Ok(title) => title,
            Err(e) => {
                debug!(window_id = id, "skipping window without title: {e}");
                return None;
            }
        };
        let (x, y, width, height) = match (window.x(), window.y(), window.width(), window.height())
        {
            (Ok(x), Ok(y), Ok(width), Ok(height)) => (x, y, width, height),
            _ => {
                debug!(window_id = id, "skipping window with unreadable bounds");
                return None;
            }
        };
        let minimized = window.is_minimized().unwrap_or(false);
        let region = Region::new(x, y, width, height);
        let maximized = monitors
            .iter()
            .any(|monitor| region.covers(monitor, MAXIMIZE_TOLERANCE));
        Some(WindowSnapshot {
            id,
            pid,
            title,
            region,
            visible: !minimized && width > 0 && height > 0,
            maximized,
        })
    }

    /// A point on the title bar, left of center to stay clear of the
    /// window-control buttons.
    fn title_bar_point(window: &WindowSnapshot) -> Point {
        let inset_x = (window.region.width as i32 / 2).min(240);
        Point::new(
            window.region.left + inset_x,
            window.region.top + TITLE_BAR_INSET,
        )
    }

    fn enigo_key(key: KeyPress) -> Key {
        match key {
            KeyPress::Enter => Key::Return,
            KeyPress::Tab => Key::Tab,
            KeyPress::Backspace => Key::Backspace,
            KeyPress::Delete => Key::Delete,
            KeyPress::Escape => Key::Escape,
            KeyPress::Control => Key::Control,
            KeyPress::Char(c) => Key::Unicode(c),
        }
    }

    fn enigo_button(button: MouseButton) -> Button {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        }
    }
}

impl DesktopEngine for NativeEngine {
    fn list_windows(&self) -> Result<Vec<WindowSnapshot>, AutomationError> {
        let windows = xcap::Window::all().map_err(|e| {
            AutomationError::PlatformError(format!("failed to enumerate windows: {e}"))
        })?;
        let monitors = Self::monitor_regions();
        Ok(windows
            .iter()
            .filter_map(|window| Self::snapshot_window(window, &monitors))
            .collect())
    }

    fn screen_size(&self) -> Result<(u32, u32), AutomationError> {
        let monitor = Self::primary_monitor()?;
        let width = monitor.width().map_err(|e| {
            AutomationError::PlatformError(format!("failed to read monitor width: {e}"))
        })?;
        let height = monitor.height().map_err(|e| {
            AutomationError::PlatformError(format!("failed to read monitor height: {e}"))
        })?;
        Ok((width, height))
    }

    fn capture_screen(&self) -> Result<RgbaImage, AutomationError> {
        let monitor = Self::primary_monitor()?;
        monitor
            .capture_image()
            .map_err(|e| AutomationError::PlatformError(format!("screen capture failed: {e}")))
    }

    fn capture_region(&self, region: Region) -> Result<RgbaImage, AutomationError> {
        let full = self.capture_screen()?;
        let clipped = region
            .clip_to_screen(full.width(), full.height())
            .ok_or_else(|| {
                AutomationError::InvalidArgument(format!(
                    "capture region {region:?} lies outside the screen"
                ))
            })?;
        Ok(image::imageops::crop_imm(
            &full,
            clipped.left as u32,
            clipped.top as u32,
            clipped.width,
            clipped.height,
        )
        .to_image())
    }

    fn recognize_words(&self, image: &RgbaImage) -> Result<Vec<OcrWord>, AutomationError> {
        let dynamic = image::DynamicImage::ImageRgba8(image.clone());
        let tess_image = rusty_tesseract::Image::from_dynamic_image(&dynamic).map_err(|e| {
            AutomationError::PlatformError(format!("failed to prepare image for OCR: {e}"))
        })?;
        let args = rusty_tesseract::Args {
            lang: self.ocr_language.clone(),
            ..rusty_tesseract::Args::default()
        };
        let output = rusty_tesseract::image_to_data(&tess_image, &args)
            .map_err(|e| AutomationError::PlatformError(format!("tesseract failed: {e}")))?;
        let mut words = Vec::new();
        for entry in output.data {
            // Tesseract emits structural rows (pages, blocks, lines) with
            // empty text and confidence -1; only word rows matter here.
            if entry.text.trim().is_empty() || entry.width <= 0 || entry.height <= 0 {
                continue;
            }
            words.push(OcrWord {
                region: Region::new(
                    entry.left,
                    entry.top,
                    entry.width as u32,
                    entry.height as u32,
                ),
                confidence: entry.conf,
                text: entry.text,
            });
        }
        Ok(words)
    }

    fn cursor_position(&self) -> Result<Point, AutomationError> {
        let input = self.input()?;
        let (x, y) = input.location().map_err(|e| {
            AutomationError::PlatformError(format!("failed to read cursor position: {e}"))
        })?;
        Ok(Point::new(x, y))
    }

    fn mouse_click(
        &self,
        at: Point,
        button: MouseButton,
        double: bool,
    ) -> Result<(), AutomationError> {
        let mut input = self.input()?;
        input
            .move_mouse(at.x, at.y, Coordinate::Abs)
            .map_err(|e| AutomationError::PlatformError(format!("mouse move failed: {e}")))?;
        thread::sleep(Duration::from_millis(20));
        let button = Self::enigo_button(button);
        input
            .button(button, Direction::Click)
            .map_err(|e| AutomationError::PlatformError(format!("mouse click failed: {e}")))?;
        if double {
            thread::sleep(Duration::from_millis(50));
            input
                .button(button, Direction::Click)
                .map_err(|e| AutomationError::PlatformError(format!("mouse click failed: {e}")))?;
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        let mut input = self.input()?;
        input
            .text(text)
            .map_err(|e| AutomationError::PlatformError(format!("text entry failed: {e}")))
    }

    fn press_key(&self, key: KeyPress) -> Result<(), AutomationError> {
        let mut input = self.input()?;
        input
            .key(Self::enigo_key(key), Direction::Click)
            .map_err(|e| AutomationError::PlatformError(format!("key press failed: {e}")))
    }

    fn press_chord(&self, keys: &[KeyPress]) -> Result<(), AutomationError> {
        let mut input = self.input()?;
        for key in keys {
            input
                .key(Self::enigo_key(*key), Direction::Press)
                .map_err(|e| AutomationError::PlatformError(format!("chord press failed: {e}")))?;
        }
        for key in keys.iter().rev() {
            input.key(Self::enigo_key(*key), Direction::Release).map_err(|e| {
                AutomationError::PlatformError(format!("chord release failed: {e}"))
            })?;
        }
        Ok(())
    }

    fn activate_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        self.mouse_click(Self::title_bar_point(window), MouseButton::Left, false)
    }

    fn maximize_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        // Double-clicking the title bar toggles the maximize state, so the
        // caller checks the snapshot's maximized flag first.
        self.mouse_click(Self::title_bar_point(window), MouseButton::Left, true)
    }

    fn close_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        self.mouse_click(Self::title_bar_point(window), MouseButton::Left, false)?;
        thread::sleep(Duration::from_millis(150));
        let mut input = self.input()?;
        input
            .key(Key::Alt, Direction::Press)
            .map_err(|e| AutomationError::PlatformError(format!("close chord failed: {e}")))?;
        let pressed = input.key(Key::F4, Direction::Click);
        input
            .key(Key::Alt, Direction::Release)
            .map_err(|e| AutomationError::PlatformError(format!("close chord failed: {e}")))?;
        pressed.map_err(|e| AutomationError::PlatformError(format!("close chord failed: {e}")))
    }

    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AutomationError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| AutomationError::PlatformError("process table lock poisoned".to_string()))?;
        system.refresh_processes(ProcessesToUpdate::All, true);
        Ok(system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                exe_path: process.exe().map(Path::to_path_buf),
            })
            .collect())
    }

    fn spawn_process(&self, path: &Path) -> Result<u32, AutomationError> {
        let child = std::process::Command::new(path).spawn().map_err(|e| {
            AutomationError::PlatformError(format!("failed to spawn {}: {e}", path.display()))
        })?;
        // The child runs detached; the caller re-finds the application by
        // scanning the process table, since launchers often hand off.
        Ok(child.id())
    }

    fn terminate_process(&self, pid: u32, force: bool) -> Result<(), AutomationError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| AutomationError::PlatformError("process table lock poisoned".to_string()))?;
        let target = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), false);
        let Some(process) = system.process(target) else {
            // Already gone, which is what termination wanted.
            return Ok(());
        };
        if force {
            if process.kill() {
                return Ok(());
            }
            return Err(AutomationError::TerminationFailure(format!(
                "kill signal to pid {pid} was not delivered"
            )));
        }
        match process.kill_with(Signal::Term) {
            Some(true) => Ok(()),
            Some(false) => Err(AutomationError::TerminationFailure(format!(
                "pid {pid} refused the term signal"
            ))),
            // Platforms without a graceful signal fall through to kill.
            None => {
                if process.kill() {
                    Ok(())
                } else {
                    Err(AutomationError::TerminationFailure(format!(
                        "kill signal to pid {pid} was not delivered"
                    )))
                }
            }
        }
    }
}
