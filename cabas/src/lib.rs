//! Visual automation for the CAB Service Platform (CABAS) desktop client.
//!
//! The client exposes no scripting interface and its accessibility tree is
//! not reliable, so this crate works the way a human operator does: find
//! the window by title, read the screen (template matching and OCR), click
//! and type with synthesized input, then look at the result and decide
//! whether the login took. Everything is heuristic and every heuristic is
//! bounded: fixed poll intervals, fixed timeouts, a fixed strategy order,
//! and a verification pass that classifies rather than guarantees.
//!
//! [`Session`] is the entry point; it owns the OS seam ([`DesktopEngine`])
//! and threads it through the window tracker, element locator, input
//! driver, strategy orchestrator, verifier and lifecycle manager.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use tracing::{info, instrument, warn};

pub mod config;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod input;
pub mod lifecycle;
pub mod locator;
pub mod poll;
pub mod shots;
pub mod strategy;
pub mod verify;
pub mod window;

pub use config::{CabasConfig, Config, LoggingConfig, Timing};
pub use engine::{
    create_engine, DesktopEngine, KeyPress, MouseButton, OcrWord, ProcessInfo, WindowSnapshot,
};
pub use errors::AutomationError;
pub use geometry::{Point, Region};
pub use locator::{ElementLocator, LocatorConfig, LoginFields};
pub use strategy::{FieldPair, LoginOutcome, LoginState, StrategyKind, StrategyTables};
pub use verify::{Verdict, VerificationKeywords};

use crate::input::ActionDriver;
use crate::lifecycle::LifecycleManager;
use crate::shots::ShotSink;
use crate::strategy::LoginOrchestrator;
use crate::verify::Verifier;
use crate::window::WindowTracker;

/// One automation session against the CABAS client.
///
/// Construct it once per run and drive it synchronously: `launch`, then
/// `login`, then `close`. All waiting is blocking; nothing here spawns
/// threads.
///
/// # Examples
///
/// ```no_run
/// use cabas::{CabasConfig, Session};
///
/// # fn main() -> Result<(), cabas::AutomationError> {
/// let config = CabasConfig::new(
///     r"C:\Program Files (x86)\CABGroup\CabgroupCSP.exe",
///     "workshop01",
///     "secret",
/// );
/// let mut session = Session::new(config)?;
/// session.launch()?;
/// let outcome = session.login();
/// println!("logged in: {}", outcome.success);
/// session.close();
/// # Ok(())
/// # }
/// ```
pub struct Session {
    config: CabasConfig,
    tracker: WindowTracker,
    orchestrator: LoginOrchestrator,
    lifecycle: LifecycleManager,
    shots: ShotSink,
}

impl Session {
    /// Builds a session on the production desktop engine.
    pub fn new(config: CabasConfig) -> Result<Self, AutomationError> {
        let engine = engine::create_engine(&config.locator.ocr_language)?;
        Ok(Self::with_engine(engine, config))
    }

    /// Builds a session on a caller-provided engine. This is the seam the
    /// scenario tests drive; embedders with their own capture or input
    /// backends use it the same way.
    pub fn with_engine(engine: Arc<dyn DesktopEngine>, config: CabasConfig) -> Self {
        let tracker = WindowTracker::new(
            Arc::clone(&engine),
            config.title_hints.clone(),
            config.timing.clone(),
        );
        let actions = ActionDriver::new(
            Arc::clone(&engine),
            config.timing.clone(),
            config.failsafe,
        );
        let locator = ElementLocator::new(Arc::clone(&engine), config.locator.clone());
        let verifier = Verifier::new(
            Arc::clone(&engine),
            ElementLocator::new(Arc::clone(&engine), config.locator.clone()),
            config.keywords.clone(),
        );
        let orchestrator = LoginOrchestrator::new(
            Arc::clone(&engine),
            actions,
            locator,
            verifier,
            config.tables.clone(),
            config.timing.clone(),
        );
        let lifecycle = LifecycleManager::new(
            Arc::clone(&engine),
            config.exe_path.clone(),
            &config.process_hint,
            config.timing.clone(),
        );
        let shots = ShotSink::new(engine, config.screenshot_path.clone());
        Self {
            config,
            tracker,
            orchestrator,
            lifecycle,
            shots,
        }
    }

    /// Starts the client unless it is already running. Errors only when
    /// the executable is missing or the process never appears.
    #[instrument(skip(self))]
    pub fn launch(&mut self) -> Result<(), AutomationError> {
        self.lifecycle.launch()
    }

    /// The full login flow: discover the window, run the strategy chain,
    /// classify the outcome. Never returns an error; failure detail rides
    /// in the [`LoginOutcome`], and diagnostic screenshots land at every
    /// checkpoint.
    #[instrument(skip(self))]
    pub fn login(&mut self) -> LoginOutcome {
        info!(user = %self.config.username, "starting login");

        let window = match self.tracker.discover() {
            Ok(window) => window,
            Err(e) => {
                warn!("login aborted before any attempt: {e}");
                self.shots.save("login_error");
                return LoginOutcome::failure(format!("window discovery failed: {e}"));
            }
        };
        info!(title = %window.title, "window ready, giving the client time to draw");
        thread::sleep(self.config.timing.long_wait());
        self.shots.save("login_start");

        let outcome = self.orchestrator.run(
            &mut self.tracker,
            &self.config.username,
            &self.config.password,
            &self.shots,
        );

        let label = if outcome.success {
            "login_success"
        } else if outcome.aborted {
            "login_error"
        } else {
            "login_failed"
        };
        self.shots.save(label);

        if outcome.success {
            info!(strategy = ?outcome.strategy, "login complete");
        } else {
            warn!(detail = %outcome.detail, "login did not succeed");
        }
        outcome
    }

    /// Closes the client with escalating force. Returns whether nothing
    /// matching the target survived.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> bool {
        self.tracker.refresh();
        let window = self.tracker.current().cloned();
        let clean = self.lifecycle.terminate(window.as_ref());
        self.tracker.clear();
        clean
    }

    /// Last observed snapshot of the target window, if any.
    pub fn window(&self) -> Option<&WindowSnapshot> {
        self.tracker.current()
    }

    /// Where the login state machine currently stands.
    pub fn state(&self) -> LoginState {
        self.orchestrator.state()
    }

    /// Whether a process matching the target is currently running.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn config(&self) -> &CabasConfig {
        &self.config
    }

    pub fn screenshot_dir(&self) -> &Path {
        self.shots.dir()
    }
}
