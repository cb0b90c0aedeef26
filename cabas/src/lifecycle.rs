//! Launches the target process and tears it down with escalating force.
//!
//! The target is identified in the process table by a path/name substring,
//! never by a held child handle alone: launchers hand off to the real
//! client, and operators start the application by hand.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::config::Timing;
use crate::engine::{DesktopEngine, ProcessInfo, WindowSnapshot};
use crate::errors::AutomationError;
use crate::poll::poll_until;

const GRACE_POLL: Duration = Duration::from_millis(250);

pub struct LifecycleManager {
    engine: Arc<dyn DesktopEngine>,
    exe_path: PathBuf,
    process_hint: String,
    timing: Timing,
    launched_pid: Option<u32>,
}

impl LifecycleManager {
    pub fn new(
        engine: Arc<dyn DesktopEngine>,
        exe_path: impl Into<PathBuf>,
        process_hint: &str,
        timing: Timing,
    ) -> Self {
        Self {
            engine,
            exe_path: exe_path.into(),
            process_hint: process_hint.to_lowercase(),
            timing,
            launched_pid: None,
        }
    }

    /// True when any process looks like the target.
    pub fn is_running(&self) -> bool {
        !self.matching_processes().is_empty()
    }

    /// Idempotent launch: an already-running target means done. Fails only
    /// when the executable is missing, cannot be spawned, or never shows
    /// up in the process table.
    #[instrument(skip(self))]
    pub fn launch(&mut self) -> Result<(), AutomationError> {
        if !self.exe_path.exists() {
            return Err(AutomationError::ExecutableNotFound(
                self.exe_path.display().to_string(),
            ));
        }
        if self.is_running() {
            info!("target process already running, skipping spawn");
            return Ok(());
        }

        let pid = self.engine.spawn_process(&self.exe_path)?;
        self.launched_pid = Some(pid);
        info!(pid, exe = %self.exe_path.display(), "spawned, waiting for the process to appear");

        let appeared = poll_until(
            self.timing.launch_timeout(),
            self.timing.launch_poll(),
            || self.is_running(),
        );
        if appeared {
            Ok(())
        } else {
            Err(AutomationError::LaunchTimeout(format!(
                "no process matching '{}' within {:?}",
                self.process_hint,
                self.timing.launch_timeout()
            )))
        }
    }

    /// Escalating teardown: close the window, shut down the spawned pid,
    /// then sweep the process table for stragglers. Each step is
    /// best-effort and independently logged. Returns whether no matching
    /// process survived.
    #[instrument(skip_all)]
    pub fn terminate(&mut self, window: Option<&WindowSnapshot>) -> bool {
        if let Some(window) = window {
            match self.engine.close_window(window) {
                Ok(()) => thread::sleep(self.timing.short_wait()),
                Err(e) => warn!("window close failed: {e}"),
            }
        }

        if let Some(pid) = self.launched_pid.take() {
            self.shutdown_pid(pid, self.timing.terminate_wait());
        }

        for process in self.matching_processes() {
            debug!(pid = process.pid, name = %process.name, "sweeping leftover process");
            self.shutdown_pid(process.pid, self.timing.kill_grace());
        }

        let clean = !self.is_running();
        if clean {
            info!("target application terminated");
        } else {
            warn!("matching processes survived every escalation");
        }
        clean
    }

    /// Ask nicely, wait out the grace period, then kill.
    fn shutdown_pid(&self, pid: u32, grace: Duration) {
        match self.engine.terminate_process(pid, false) {
            Ok(()) => debug!(pid, "termination requested"),
            Err(e) => debug!(pid, "graceful termination failed: {e}"),
        }
        if poll_until(grace, GRACE_POLL.min(grace), || !self.pid_alive(pid)) {
            return;
        }
        match self.engine.terminate_process(pid, true) {
            Ok(()) => debug!(pid, "force kill delivered"),
            Err(e) => warn!(pid, "force kill failed: {e}"),
        }
    }

    fn pid_alive(&self, pid: u32) -> bool {
        match self.engine.list_processes() {
            Ok(processes) => processes.iter().any(|p| p.pid == pid),
            Err(_) => false,
        }
    }

    fn matching_processes(&self) -> Vec<ProcessInfo> {
        match self.engine.list_processes() {
            Ok(processes) => processes
                .into_iter()
                .filter(|p| self.matches(p))
                .collect(),
            Err(e) => {
                debug!("process enumeration failed: {e}");
                Vec::new()
            }
        }
    }

    fn matches(&self, process: &ProcessInfo) -> bool {
        if let Some(path) = &process.exe_path {
            if path
                .to_string_lossy()
                .to_lowercase()
                .contains(&self.process_hint)
            {
                return true;
            }
        }
        process.name.to_lowercase().contains(&self.process_hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MouseButton;
    use crate::geometry::{Point, Region};
    use image::RgbaImage;
    use std::path::Path;

    struct NoProcessEngine;

    impl DesktopEngine for NoProcessEngine {
        fn list_windows(&self) -> Result<Vec<WindowSnapshot>, AutomationError> {
            Ok(Vec::new())
        }
        fn screen_size(&self) -> Result<(u32, u32), AutomationError> {
            Ok((1920, 1080))
        }
        fn capture_screen(&self) -> Result<RgbaImage, AutomationError> {
            Ok(RgbaImage::new(4, 4))
        }
        fn capture_region(&self, _: Region) -> Result<RgbaImage, AutomationError> {
            Ok(RgbaImage::new(4, 4))
        }
        fn recognize_words(
            &self,
            _: &RgbaImage,
        ) -> Result<Vec<crate::engine::OcrWord>, AutomationError> {
            Ok(Vec::new())
        }
        fn cursor_position(&self) -> Result<Point, AutomationError> {
            Ok(Point::new(500, 500))
        }
        fn mouse_click(&self, _: Point, _: MouseButton, _: bool) -> Result<(), AutomationError> {
            Ok(())
        }
        fn type_text(&self, _: &str) -> Result<(), AutomationError> {
            Ok(())
        }
        fn press_key(&self, _: crate::engine::KeyPress) -> Result<(), AutomationError> {
            Ok(())
        }
        fn press_chord(&self, _: &[crate::engine::KeyPress]) -> Result<(), AutomationError> {
            Ok(())
        }
        fn activate_window(&self, _: &WindowSnapshot) -> Result<(), AutomationError> {
            Ok(())
        }
        fn maximize_window(&self, _: &WindowSnapshot) -> Result<(), AutomationError> {
            Ok(())
        }
        fn close_window(&self, _: &WindowSnapshot) -> Result<(), AutomationError> {
            Ok(())
        }
        fn list_processes(&self) -> Result<Vec<ProcessInfo>, AutomationError> {
            Ok(Vec::new())
        }
        fn spawn_process(&self, _: &Path) -> Result<u32, AutomationError> {
            Ok(1234)
        }
        fn terminate_process(&self, _: u32, _: bool) -> Result<(), AutomationError> {
            Ok(())
        }
    }

    #[test]
    fn missing_executable_is_fatal() {
        let mut lifecycle = LifecycleManager::new(
            Arc::new(NoProcessEngine),
            "/no/such/CabgroupCSP.exe",
            "CAB",
            Timing::default(),
        );
        match lifecycle.launch() {
            Err(AutomationError::ExecutableNotFound(path)) => {
                assert!(path.contains("CabgroupCSP.exe"))
            }
            other => panic!("expected ExecutableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn hint_matches_path_or_name_case_insensitively() {
        let lifecycle = LifecycleManager::new(
            Arc::new(NoProcessEngine),
            "CabgroupCSP.exe",
            "CAB",
            Timing::default(),
        );
        let by_path = ProcessInfo {
            pid: 1,
            name: "shell.exe".to_string(),
            exe_path: Some(PathBuf::from("C:\\Program Files\\cabgroup\\shell.exe")),
        };
        let by_name = ProcessInfo {
            pid: 2,
            name: "CabgroupCSP".to_string(),
            exe_path: None,
        };
        let unrelated = ProcessInfo {
            pid: 3,
            name: "notepad.exe".to_string(),
            exe_path: Some(PathBuf::from("C:\\Windows\\notepad.exe")),
        };
        assert!(lifecycle.matches(&by_path));
        assert!(lifecycle.matches(&by_name));
        assert!(!lifecycle.matches(&unrelated));
    }
}
