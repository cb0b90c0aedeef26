//! The login state machine.
//!
//! Three self-contained strategies run in a fixed priority order, each a
//! complete attempt to fill and submit the credential form. The order
//! encodes layout knowledge gathered against the production client, not
//! anything adaptive: detection first, then window-relative coordinate
//! pairs, then blind screen-relative offsets. The first attempt whose
//! post-settle verification succeeds ends the run.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Timing;
use crate::engine::{DesktopEngine, KeyPress};
use crate::errors::AutomationError;
use crate::geometry::Point;
use crate::input::ActionDriver;
use crate::locator::ElementLocator;
use crate::shots::ShotSink;
use crate::verify::{Verdict, Verifier};
use crate::window::WindowTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Detection,
    FallbackCoordinate,
    ScreenBased,
}

impl StrategyKind {
    /// Fixed global priority order.
    pub const ORDER: [StrategyKind; 3] = [
        StrategyKind::Detection,
        StrategyKind::FallbackCoordinate,
        StrategyKind::ScreenBased,
    ];
}

/// Where the orchestrator currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NotAttempted,
    AttemptInProgress(StrategyKind),
    Verified {
        strategy: StrategyKind,
        success: bool,
    },
    Exhausted,
}

/// What a physical screen offset is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The tracked window's center, falling back to the screen center
    /// when the window cannot be resolved.
    #[default]
    Window,
    /// Always the screen center.
    Screen,
}

/// One candidate placement of the two credential fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldPair {
    pub username: (i32, i32),
    pub password: (i32, i32),
    #[serde(default)]
    pub anchor: Anchor,
}

/// The hand-tuned coordinate tables. These are layout guesses measured
/// against the production client; they live in configuration so a
/// deployment can re-tune them without touching orchestration code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTables {
    /// Field pairs tried, in order, by the fallback-coordinate strategy.
    #[serde(default = "default_fallback_pairs")]
    pub fallback_pairs: Vec<FieldPair>,
    /// Username-field vertical offsets from the screen center tried by
    /// the screen-based strategy.
    #[serde(default = "default_screen_username_offsets")]
    pub screen_username_offsets_y: Vec<i32>,
    /// Continue-button vertical offsets below the screen center, tried in
    /// order before falling back to Enter.
    #[serde(default = "default_continue_offsets")]
    pub continue_button_offsets_y: Vec<i32>,
}

impl Default for StrategyTables {
    fn default() -> Self {
        Self {
            fallback_pairs: default_fallback_pairs(),
            screen_username_offsets_y: default_screen_username_offsets(),
            continue_button_offsets_y: default_continue_offsets(),
        }
    }
}

fn default_fallback_pairs() -> Vec<FieldPair> {
    vec![
        FieldPair {
            username: (0, -50),
            password: (0, -10),
            anchor: Anchor::Window,
        },
        FieldPair {
            username: (-50, -30),
            password: (-50, 10),
            anchor: Anchor::Window,
        },
        FieldPair {
            username: (50, -30),
            password: (50, 10),
            anchor: Anchor::Window,
        },
        FieldPair {
            username: (0, -60),
            password: (0, -20),
            anchor: Anchor::Screen,
        },
    ]
}

fn default_screen_username_offsets() -> Vec<i32> {
    vec![-80, -60, -100, -40, -20, 0]
}

fn default_continue_offsets() -> Vec<i32> {
    vec![40, 60, 20, 80, 100]
}

/// Result of a whole login run.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    /// The strategy whose attempt verified, when one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub detail: String,
    /// Set when the corner failsafe stopped the run.
    #[serde(skip_serializing_if = "is_false")]
    pub aborted: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LoginOutcome {
    fn verified(strategy: StrategyKind) -> Self {
        Self {
            success: true,
            strategy: Some(strategy),
            detail: "login verified".to_string(),
            aborted: false,
        }
    }

    pub(crate) fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy: None,
            detail: detail.into(),
            aborted: false,
        }
    }

    fn emergency_abort(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy: None,
            detail: detail.into(),
            aborted: true,
        }
    }
}

pub struct LoginOrchestrator {
    engine: Arc<dyn DesktopEngine>,
    actions: ActionDriver,
    locator: ElementLocator,
    verifier: Verifier,
    tables: StrategyTables,
    timing: Timing,
    state: LoginState,
}

impl LoginOrchestrator {
    pub fn new(
        engine: Arc<dyn DesktopEngine>,
        actions: ActionDriver,
        locator: ElementLocator,
        verifier: Verifier,
        tables: StrategyTables,
        timing: Timing,
    ) -> Self {
        Self {
            engine,
            actions,
            locator,
            verifier,
            tables,
            timing,
            state: LoginState::NotAttempted,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Runs the strategies in their fixed order until one attempt is
    /// verified successful or all are exhausted. Attempt execution errors
    /// are absorbed here and demote to the next strategy; only the corner
    /// failsafe stops the run outright.
    #[instrument(skip_all)]
    pub fn run(
        &mut self,
        tracker: &mut WindowTracker,
        username: &str,
        password: &str,
        shots: &ShotSink,
    ) -> LoginOutcome {
        self.state = LoginState::NotAttempted;

        for kind in StrategyKind::ORDER {
            self.state = LoginState::AttemptInProgress(kind);
            info!(strategy = ?kind, "starting login attempt");

            let executed = match kind {
                StrategyKind::Detection => {
                    self.attempt_detection(tracker, username, password, shots)
                }
                StrategyKind::FallbackCoordinate => {
                    self.attempt_fallback_pairs(tracker, username, password)
                }
                StrategyKind::ScreenBased => self.attempt_screen_based(username, password),
            };

            match executed {
                Ok(()) => {
                    debug!(
                        strategy = ?kind,
                        settle = ?self.timing.settle_after_attempt(),
                        "attempt dispatched, letting the UI settle"
                    );
                    thread::sleep(self.timing.settle_after_attempt());
                    let verdict = self.verifier.verify(tracker);
                    if verdict == Verdict::Success {
                        self.state = LoginState::Verified {
                            strategy: kind,
                            success: true,
                        };
                        info!(strategy = ?kind, "login verified");
                        return LoginOutcome::verified(kind);
                    }
                    self.state = LoginState::Verified {
                        strategy: kind,
                        success: false,
                    };
                    warn!(strategy = ?kind, ?verdict, "attempt did not verify, moving on");
                }
                Err(AutomationError::InputAborted(reason)) => {
                    error!(strategy = ?kind, "emergency abort: {reason}");
                    self.state = LoginState::Exhausted;
                    return LoginOutcome::emergency_abort(format!("emergency abort: {reason}"));
                }
                Err(e) => {
                    warn!(strategy = ?kind, "attempt could not be executed: {e}");
                }
            }
        }

        self.state = LoginState::Exhausted;
        LoginOutcome::failure("all login strategies exhausted without a verified success")
    }

    /// Strategy 1: read the form. Locate labeled fields inside the window
    /// and fill them, advancing focus by Tab when only the username field
    /// was found.
    fn attempt_detection(
        &self,
        tracker: &mut WindowTracker,
        username: &str,
        password: &str,
        shots: &ShotSink,
    ) -> Result<(), AutomationError> {
        shots.save("login_attempt_start");
        tracker.activate_and_maximize();

        let fields = self.locator.find_login_fields(tracker.current());
        if fields.is_empty() {
            return Err(AutomationError::FieldDetectionFailure(
                "no login fields detected in the window".to_string(),
            ));
        }

        if let Some(at) = fields.username {
            self.actions.click(at)?;
            self.actions.type_text(username, true, true)?;
        }
        match fields.password {
            Some(at) => self.actions.click(at)?,
            None => self.actions.press(KeyPress::Tab)?,
        }
        self.actions.type_text(password, true, true)?;
        self.actions.press(KeyPress::Enter)
    }

    /// Strategy 2: walk the configured field-pair table. The first pair
    /// whose clicks and keystrokes all dispatch cleanly counts as the
    /// attempt; whether it actually logged in is the verifier's problem.
    fn attempt_fallback_pairs(
        &self,
        tracker: &mut WindowTracker,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError> {
        tracker.refresh();
        let screen_center = self.screen_center();
        let reference = tracker
            .current()
            .map(|window| window.center())
            .or(screen_center);

        for (index, pair) in self.tables.fallback_pairs.iter().enumerate() {
            let anchor = match pair.anchor {
                Anchor::Window => reference,
                Anchor::Screen => screen_center,
            };
            let Some(anchor) = anchor else {
                debug!(pair = index, "no anchor resolvable, skipping pair");
                continue;
            };
            match self.fill_pair(anchor, pair, username, password) {
                Ok(()) => {
                    debug!(pair = index, "fallback pair dispatched");
                    return Ok(());
                }
                Err(e @ AutomationError::InputAborted(_)) => return Err(e),
                Err(e) => debug!(pair = index, "fallback pair failed: {e}"),
            }
        }
        Err(AutomationError::AttemptFailed(
            "every fallback coordinate pair failed".to_string(),
        ))
    }

    fn fill_pair(
        &self,
        anchor: Point,
        pair: &FieldPair,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError> {
        self.actions
            .click(anchor.offset(pair.username.0, pair.username.1))?;
        self.actions.type_text(username, true, false)?;
        self.actions
            .click(anchor.offset(pair.password.0, pair.password.1))?;
        self.actions.type_text(password, true, false)?;
        self.actions.press(KeyPress::Enter)
    }

    /// Strategy 3: ignore the window entirely and probe username-field
    /// slots around the screen center, submitting via the continue-button
    /// table or Enter.
    fn attempt_screen_based(&self, username: &str, password: &str) -> Result<(), AutomationError> {
        let Some(center) = self.screen_center() else {
            return Err(AutomationError::AttemptFailed(
                "screen dimensions unavailable".to_string(),
            ));
        };

        for (index, dy) in self.tables.screen_username_offsets_y.iter().enumerate() {
            match self.fill_from_screen_center(center, *dy, username, password) {
                Ok(()) => return Ok(()),
                Err(e @ AutomationError::InputAborted(_)) => return Err(e),
                Err(e) => debug!(slot = index, "screen-based variant failed: {e}"),
            }
        }
        Err(AutomationError::AttemptFailed(
            "every screen-based variant failed".to_string(),
        ))
    }

    fn fill_from_screen_center(
        &self,
        center: Point,
        username_dy: i32,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError> {
        self.actions.click(center.offset(0, username_dy))?;
        self.actions.select_all()?;
        self.actions.type_text(username, false, true)?;
        self.actions.press(KeyPress::Tab)?;
        self.actions.type_text(password, false, true)?;

        let mut submitted = false;
        for offset in &self.tables.continue_button_offsets_y {
            match self.actions.click(center.offset(0, *offset)) {
                Ok(()) => {
                    submitted = true;
                    break;
                }
                Err(e @ AutomationError::InputAborted(_)) => return Err(e),
                Err(e) => debug!(offset, "continue button slot failed: {e}"),
            }
        }
        if !submitted {
            self.actions.press(KeyPress::Enter)?;
        }
        Ok(())
    }

    fn screen_center(&self) -> Option<Point> {
        match self.engine.screen_size() {
            Ok((width, height)) => Some(Point::new(width as i32 / 2, height as i32 / 2)),
            Err(e) => {
                debug!("screen size unavailable: {e}");
                None
            }
        }
    }
}
