//! Tracks the target application's top-level window.
//!
//! The window has no stable handle: it is re-found by title every time it
//! matters. The tracker owns the only [`WindowSnapshot`] in the system and
//! hands out clones; callers must `refresh()` before trusting the title or
//! rectangle.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info, instrument, warn};

use crate::config::Timing;
use crate::engine::{DesktopEngine, WindowSnapshot};
use crate::errors::AutomationError;
use crate::poll::poll_until;

/// Windows smaller than this are splash screens or tooltips, never the
/// main shell.
const MIN_WIDTH: u32 = 100;
const MIN_HEIGHT: u32 = 100;

pub struct WindowTracker {
    engine: Arc<dyn DesktopEngine>,
    title_hints: Vec<String>,
    timing: Timing,
    current: Option<WindowSnapshot>,
}

impl WindowTracker {
    pub fn new(engine: Arc<dyn DesktopEngine>, title_hints: Vec<String>, timing: Timing) -> Self {
        Self {
            engine,
            title_hints,
            timing,
            current: None,
        }
    }

    /// The last observed snapshot, possibly stale.
    pub fn current(&self) -> Option<&WindowSnapshot> {
        self.current.as_ref()
    }

    /// Drops the tracked snapshot, e.g. after closing the application.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Polls window enumeration until a usable window matching one of the
    /// title hints appears. Enumeration failures are logged and retried;
    /// only the deadline produces an error.
    #[instrument(skip(self))]
    pub fn discover(&mut self) -> Result<WindowSnapshot, AutomationError> {
        let timeout = self.timing.window_timeout();
        let interval = self.timing.window_poll();
        debug!(hints = ?self.title_hints, ?timeout, "searching for target window");

        let engine = Arc::clone(&self.engine);
        let hints = self.title_hints.clone();
        let mut found: Option<WindowSnapshot> = None;
        poll_until(timeout, interval, || {
            found = Self::fuzzy_match(engine.as_ref(), &hints);
            found.is_some()
        });

        match found {
            Some(window) => {
                info!(title = %window.title, region = ?window.region, "target window found");
                self.current = Some(window.clone());
                Ok(window)
            }
            None => Err(AutomationError::WindowNotFound(format!(
                "no visible window matching {:?} appeared within {timeout:?}",
                self.title_hints
            ))),
        }
    }

    /// Re-resolves the tracked window: exact title first, then the same
    /// fuzzy hint match as `discover`. Returns whether a fresh snapshot was
    /// obtained; on failure the stale snapshot is kept so callers can
    /// proceed with what they had.
    pub fn refresh(&mut self) -> bool {
        let windows = match self.engine.list_windows() {
            Ok(windows) => windows,
            Err(e) => {
                debug!("window enumeration failed during refresh: {e}");
                return false;
            }
        };

        if let Some(current) = &self.current {
            if let Some(exact) = windows.iter().find(|w| w.title == current.title) {
                self.current = Some(exact.clone());
                return true;
            }
        }

        match windows
            .into_iter()
            .find(|w| Self::is_candidate(w, &self.title_hints))
        {
            Some(window) => {
                debug!(title = %window.title, "window re-resolved by title hint");
                self.current = Some(window);
                true
            }
            None => {
                debug!("refresh found no matching window, keeping previous snapshot");
                false
            }
        }
    }

    /// Brings the window to the foreground and maximizes it. Every
    /// sub-step is best-effort: a window manager refusing activation must
    /// not abort the login flow.
    #[instrument(skip(self))]
    pub fn activate_and_maximize(&mut self) {
        self.refresh();
        let Some(window) = self.current.clone() else {
            debug!("no window tracked, nothing to activate");
            return;
        };

        if let Err(e) = self.engine.activate_window(&window) {
            warn!("window activation failed: {e}");
        }
        thread::sleep(self.timing.default_wait());

        if !window.maximized {
            if let Err(e) = self.engine.maximize_window(&window) {
                warn!("window maximize failed: {e}");
            }
            thread::sleep(self.timing.default_wait());
            // The rectangle just changed; pick it up for region searches.
            self.refresh();
        }

        if let Some(window) = self.current.clone() {
            if let Err(e) = self.engine.activate_window(&window) {
                warn!("window re-activation failed: {e}");
            }
        }
        thread::sleep(self.timing.short_wait());
    }

    fn fuzzy_match(engine: &dyn DesktopEngine, hints: &[String]) -> Option<WindowSnapshot> {
        let windows = match engine.list_windows() {
            Ok(windows) => windows,
            Err(e) => {
                debug!("window enumeration failed, retrying: {e}");
                return None;
            }
        };
        windows.into_iter().find(|w| Self::is_candidate(w, hints))
    }

    fn is_candidate(window: &WindowSnapshot, hints: &[String]) -> bool {
        if !window.visible || window.region.width <= MIN_WIDTH || window.region.height <= MIN_HEIGHT
        {
            return false;
        }
        let title = window.title.to_lowercase();
        hints.iter().any(|hint| title.contains(&hint.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Region;

    fn snapshot(title: &str, width: u32, height: u32, visible: bool) -> WindowSnapshot {
        WindowSnapshot {
            id: 1,
            pid: 42,
            title: title.to_string(),
            region: Region::new(0, 0, width, height),
            visible,
            maximized: false,
        }
    }

    fn hints() -> Vec<String> {
        vec!["CAB Service Platform".to_string(), "CABAS".to_string()]
    }

    #[test]
    fn candidate_matching_is_case_insensitive_substring() {
        let w = snapshot("cabas - claims overview", 800, 600, true);
        assert!(WindowTracker::is_candidate(&w, &hints()));

        let other = snapshot("Text Editor", 800, 600, true);
        assert!(!WindowTracker::is_candidate(&other, &hints()));
    }

    #[test]
    fn tiny_or_hidden_windows_are_rejected() {
        let splash = snapshot("CABAS", 100, 40, true);
        assert!(!WindowTracker::is_candidate(&splash, &hints()));

        let hidden = snapshot("CABAS", 800, 600, false);
        assert!(!WindowTracker::is_candidate(&hidden, &hints()));
    }
}
