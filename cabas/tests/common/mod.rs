//! Scripted desktop backend shared by the scenario tests.
//!
//! Every observation channel is seeded up front (windows, OCR words,
//! processes, optionally real pixels) and every input channel is recorded
//! for assertion. OCR words are scripted in absolute screen coordinates;
//! `recognize_words` translates the ones falling inside the most recent
//! capture into image-local boxes, the same contract the production engine
//! honors.

// Each test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use image::RgbaImage;

use cabas::{
    AutomationError, CabasConfig, DesktopEngine, KeyPress, MouseButton, OcrWord, Point,
    ProcessInfo, Region, Timing, WindowSnapshot,
};

/// Debug logging for test runs; safe to call from every test.
pub fn setup_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct MockEngine {
    pub screen: (u32, u32),
    pub windows: Mutex<Vec<WindowSnapshot>>,
    /// Scripted OCR output, boxes in screen coordinates.
    pub words: Mutex<Vec<OcrWord>>,
    pub processes: Mutex<Vec<ProcessInfo>>,
    /// When set, captures crop this image instead of returning blank pixels.
    pub screen_pixels: Mutex<Option<RgbaImage>>,
    /// Makes every capture fail, for unobservable-state scenarios.
    pub fail_capture: bool,
    /// Whether a spawned process shows up in the process table.
    pub spawn_registers_process: bool,
    /// When set, only forced termination removes a process.
    pub ignore_graceful_term: bool,
    pub cursor: Mutex<Point>,
    promote: Mutex<Option<(u32, String)>>,
    last_capture: Mutex<Option<Region>>,

    pub clicks: Mutex<Vec<(Point, MouseButton, bool)>>,
    pub typed: Mutex<Vec<String>>,
    pub keys: Mutex<Vec<KeyPress>>,
    pub chords: Mutex<Vec<Vec<KeyPress>>>,
    pub activated: Mutex<Vec<u32>>,
    pub maximize_calls: Mutex<Vec<u32>>,
    pub closed: Mutex<Vec<u32>>,
    pub kills: Mutex<Vec<(u32, bool)>>,
    pub spawn_count: Mutex<u32>,
}

impl MockEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: (width, height),
            windows: Mutex::new(Vec::new()),
            words: Mutex::new(Vec::new()),
            processes: Mutex::new(Vec::new()),
            screen_pixels: Mutex::new(None),
            fail_capture: false,
            spawn_registers_process: true,
            ignore_graceful_term: false,
            cursor: Mutex::new(Point::new(500, 400)),
            promote: Mutex::new(None),
            last_capture: Mutex::new(None),
            clicks: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
            chords: Mutex::new(Vec::new()),
            activated: Mutex::new(Vec::new()),
            maximize_calls: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            kills: Mutex::new(Vec::new()),
            spawn_count: Mutex::new(0),
        }
    }

    pub fn add_window(&self, window: WindowSnapshot) {
        self.windows.lock().unwrap().push(window);
    }

    pub fn add_word(&self, text: &str, left: i32, top: i32, width: u32, height: u32, conf: f32) {
        self.words.lock().unwrap().push(OcrWord {
            text: text.to_string(),
            region: Region::new(left, top, width, height),
            confidence: conf,
        });
    }

    pub fn add_process(&self, pid: u32, name: &str) {
        self.processes.lock().unwrap().push(ProcessInfo {
            pid,
            name: name.to_string(),
            exe_path: None,
        });
    }

    pub fn set_cursor(&self, at: Point) {
        *self.cursor.lock().unwrap() = at;
    }

    /// Retitles the first window once the n-th Enter press lands,
    /// simulating a login that takes effect on submission.
    pub fn promote_title_after_enters(&self, presses: u32, title: &str) {
        *self.promote.lock().unwrap() = Some((presses, title.to_string()));
    }

    /// Everything typed so far, concatenated.
    pub fn typed_text(&self) -> String {
        self.typed.lock().unwrap().concat()
    }

    pub fn click_points(&self) -> Vec<Point> {
        self.clicks.lock().unwrap().iter().map(|c| c.0).collect()
    }

    pub fn key_count(&self, key: KeyPress) -> usize {
        self.keys.lock().unwrap().iter().filter(|k| **k == key).count()
    }
}

impl DesktopEngine for MockEngine {
    fn list_windows(&self) -> Result<Vec<WindowSnapshot>, AutomationError> {
        Ok(self.windows.lock().unwrap().clone())
    }

    fn screen_size(&self) -> Result<(u32, u32), AutomationError> {
        Ok(self.screen)
    }

    fn capture_screen(&self) -> Result<RgbaImage, AutomationError> {
        if self.fail_capture {
            return Err(AutomationError::PlatformError("capture disabled".into()));
        }
        let (width, height) = self.screen;
        *self.last_capture.lock().unwrap() = Some(Region::new(0, 0, width, height));
        Ok(match &*self.screen_pixels.lock().unwrap() {
            Some(pixels) => pixels.clone(),
            None => RgbaImage::new(width, height),
        })
    }

    fn capture_region(&self, region: Region) -> Result<RgbaImage, AutomationError> {
        if self.fail_capture {
            return Err(AutomationError::PlatformError("capture disabled".into()));
        }
        *self.last_capture.lock().unwrap() = Some(region);
        Ok(match &*self.screen_pixels.lock().unwrap() {
            Some(pixels) => image::imageops::crop_imm(
                pixels,
                region.left.max(0) as u32,
                region.top.max(0) as u32,
                region.width,
                region.height,
            )
            .to_image(),
            None => RgbaImage::new(region.width, region.height),
        })
    }

    fn recognize_words(&self, _image: &RgbaImage) -> Result<Vec<OcrWord>, AutomationError> {
        let Some(capture) = *self.last_capture.lock().unwrap() else {
            return Ok(Vec::new());
        };
        let words = self.words.lock().unwrap();
        Ok(words
            .iter()
            .filter_map(|word| {
                let left = word.region.left - capture.left;
                let top = word.region.top - capture.top;
                let fits = left >= 0
                    && top >= 0
                    && left + word.region.width as i32 <= capture.width as i32
                    && top + word.region.height as i32 <= capture.height as i32;
                fits.then(|| OcrWord {
                    text: word.text.clone(),
                    region: Region::new(left, top, word.region.width, word.region.height),
                    confidence: word.confidence,
                })
            })
            .collect())
    }

    fn cursor_position(&self) -> Result<Point, AutomationError> {
        Ok(*self.cursor.lock().unwrap())
    }

    fn mouse_click(&self, at: Point, button: MouseButton, double: bool) -> Result<(), AutomationError> {
        self.clicks.lock().unwrap().push((at, button, double));
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn press_key(&self, key: KeyPress) -> Result<(), AutomationError> {
        self.keys.lock().unwrap().push(key);
        if key == KeyPress::Enter {
            let mut promote = self.promote.lock().unwrap();
            if let Some((remaining, title)) = promote.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    if let Some(window) = self.windows.lock().unwrap().first_mut() {
                        window.title = title.clone();
                    }
                    *promote = None;
                }
            }
        }
        Ok(())
    }

    fn press_chord(&self, keys: &[KeyPress]) -> Result<(), AutomationError> {
        self.chords.lock().unwrap().push(keys.to_vec());
        Ok(())
    }

    fn activate_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        self.activated.lock().unwrap().push(window.id);
        Ok(())
    }

    fn maximize_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        self.maximize_calls.lock().unwrap().push(window.id);
        if let Some(w) = self
            .windows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|w| w.id == window.id)
        {
            w.maximized = true;
        }
        Ok(())
    }

    fn close_window(&self, window: &WindowSnapshot) -> Result<(), AutomationError> {
        self.closed.lock().unwrap().push(window.id);
        self.windows.lock().unwrap().retain(|w| w.id != window.id);
        Ok(())
    }

    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AutomationError> {
        Ok(self.processes.lock().unwrap().clone())
    }

    fn spawn_process(&self, path: &Path) -> Result<u32, AutomationError> {
        let mut count = self.spawn_count.lock().unwrap();
        *count += 1;
        let pid = 4000 + *count;
        if self.spawn_registers_process {
            self.processes.lock().unwrap().push(ProcessInfo {
                pid,
                name: "CabgroupCSP.exe".to_string(),
                exe_path: Some(path.to_path_buf()),
            });
        }
        Ok(pid)
    }

    fn terminate_process(&self, pid: u32, force: bool) -> Result<(), AutomationError> {
        self.kills.lock().unwrap().push((pid, force));
        if force || !self.ignore_graceful_term {
            self.processes.lock().unwrap().retain(|p| p.pid != pid);
        }
        Ok(())
    }
}

/// A healthy main window for the target client.
pub fn shell_window(title: &str, region: Region) -> WindowSnapshot {
    WindowSnapshot {
        id: 1,
        pid: 77,
        title: title.to_string(),
        region,
        visible: true,
        maximized: true,
    }
}

pub fn title_hints() -> Vec<String> {
    vec!["CAB Service Platform".to_string(), "CABAS".to_string()]
}

/// All waits collapsed so scenario runs finish in milliseconds.
pub fn fast_timing() -> Timing {
    Timing {
        default_wait_ms: 0,
        long_wait_ms: 0,
        short_wait_ms: 0,
        inter_key_ms: 0,
        action_pause_ms: 0,
        settle_after_attempt_ms: 0,
        window_timeout_ms: 50,
        window_poll_ms: 10,
        launch_timeout_ms: 50,
        launch_poll_ms: 10,
        terminate_wait_ms: 20,
        kill_grace_ms: 20,
    }
}

pub fn test_config(screenshot_dir: &Path) -> CabasConfig {
    let mut config = CabasConfig::new("target.exe", "workshop01", "hunter2");
    config.screenshot_path = screenshot_dir.to_string_lossy().into_owned();
    config.timing = fast_timing();
    config
}

/// File names currently present in a screenshot directory.
pub fn artifact_names(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}
