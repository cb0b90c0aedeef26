//! Configuration model for an automation run.
//!
//! The file layout mirrors what the wider toolchain consumes: the `cabas`
//! section drives this crate, while `workshops`, `pm_system` and
//! `excel_monitoring` are carried opaquely for downstream pipelines that
//! read the same file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AutomationError;
use crate::locator::LocatorConfig;
use crate::strategy::StrategyTables;
use crate::verify::VerificationKeywords;

/// Full configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cabas: CabasConfig,
    /// Consumed by the workshop-assignment pipeline, opaque here.
    pub workshops: serde_json::Value,
    /// Consumed by the PM-system sync, opaque here.
    pub pm_system: serde_json::Value,
    /// Consumed by the spreadsheet monitor, opaque here.
    pub excel_monitoring: serde_json::Value,
    #[serde(default)]
    pub teams_integration: Option<serde_json::Value>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AutomationError::InvalidConfiguration(format!(
                "cannot read {}: {e}",
                path.display()
            ))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            AutomationError::InvalidConfiguration(format!(
                "malformed config {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields the automation cannot run without.
    pub fn validate(&self) -> Result<(), AutomationError> {
        for (name, value) in [
            ("cabas.exe_path", &self.cabas.exe_path),
            ("cabas.username", &self.cabas.username),
            ("cabas.password", &self.cabas.password),
        ] {
            if value.trim().is_empty() {
                return Err(AutomationError::InvalidConfiguration(format!(
                    "{name} is required"
                )));
            }
        }
        Ok(())
    }

    /// Human-readable summary with the password masked.
    pub fn summary(&self) -> String {
        let url = self.cabas.url.as_deref().unwrap_or("(none)");
        format!(
            "CABAS executable: {}\n\
             Username:         {}\n\
             Password:         ***\n\
             URL:              {}\n\
             Screenshots:      {}\n\
             Log file:         {}",
            self.cabas.exe_path,
            self.cabas.username,
            url,
            self.cabas.screenshot_path,
            self.logging.file_path,
        )
    }
}

/// The section driving this crate: credentials, target identity, and every
/// tunable the engine reads. Only the first three fields are required; the
/// rest default to the values tuned against the production client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabasConfig {
    pub exe_path: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_screenshot_path")]
    pub screenshot_path: String,
    /// Substring identifying the target in executable paths and process
    /// names, matched case-insensitively.
    #[serde(default = "default_process_hint")]
    pub process_hint: String,
    /// Title fragments accepted during window discovery, most specific
    /// first.
    #[serde(default = "default_title_hints")]
    pub title_hints: Vec<String>,
    /// When set, parking the cursor in a screen corner aborts input
    /// dispatch (manual emergency stop).
    #[serde(default = "default_true")]
    pub failsafe: bool,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub keywords: VerificationKeywords,
    #[serde(default)]
    pub tables: StrategyTables,
}

impl CabasConfig {
    /// Minimal config for a given credential set, everything else default.
    pub fn new(
        exe_path: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            exe_path: exe_path.into(),
            username: username.into(),
            password: password.into(),
            url: None,
            screenshot_path: default_screenshot_path(),
            process_hint: default_process_hint(),
            title_hints: default_title_hints(),
            failsafe: default_true(),
            timing: Timing::default(),
            locator: LocatorConfig::default(),
            keywords: VerificationKeywords::default(),
            tables: StrategyTables::default(),
        }
    }
}

/// Every delay and deadline in the engine, in milliseconds. The target
/// client is slow to redraw, so all defaults err on the patient side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default = "default_wait_ms")]
    pub default_wait_ms: u64,
    #[serde(default = "long_wait_ms")]
    pub long_wait_ms: u64,
    #[serde(default = "short_wait_ms")]
    pub short_wait_ms: u64,
    /// Per-character delay when typing in slow mode.
    #[serde(default = "inter_key_ms")]
    pub inter_key_ms: u64,
    /// Pause inserted before every synthesized input event.
    #[serde(default = "action_pause_ms")]
    pub action_pause_ms: u64,
    /// How long the UI gets to react to a completed login attempt before
    /// verification runs.
    #[serde(default = "settle_after_attempt_ms")]
    pub settle_after_attempt_ms: u64,
    #[serde(default = "window_timeout_ms")]
    pub window_timeout_ms: u64,
    #[serde(default = "window_poll_ms")]
    pub window_poll_ms: u64,
    #[serde(default = "launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    #[serde(default = "launch_poll_ms")]
    pub launch_poll_ms: u64,
    /// Grace period after asking the tracked process to exit.
    #[serde(default = "terminate_wait_ms")]
    pub terminate_wait_ms: u64,
    /// Grace period granted to stray processes before the hard kill.
    #[serde(default = "kill_grace_ms")]
    pub kill_grace_ms: u64,
}

macro_rules! duration_accessors {
    ($($method:ident => $field:ident),* $(,)?) => {
        impl Timing {
            $(pub fn $method(&self) -> Duration {
                Duration::from_millis(self.$field)
            })*
        }
    };
}

duration_accessors! {
    default_wait => default_wait_ms,
    long_wait => long_wait_ms,
    short_wait => short_wait_ms,
    inter_key => inter_key_ms,
    action_pause => action_pause_ms,
    settle_after_attempt => settle_after_attempt_ms,
    window_timeout => window_timeout_ms,
    window_poll => window_poll_ms,
    launch_timeout => launch_timeout_ms,
    launch_poll => launch_poll_ms,
    terminate_wait => terminate_wait_ms,
    kill_grace => kill_grace_ms,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            default_wait_ms: default_wait_ms(),
            long_wait_ms: long_wait_ms(),
            short_wait_ms: short_wait_ms(),
            inter_key_ms: inter_key_ms(),
            action_pause_ms: action_pause_ms(),
            settle_after_attempt_ms: settle_after_attempt_ms(),
            window_timeout_ms: window_timeout_ms(),
            window_poll_ms: window_poll_ms(),
            launch_timeout_ms: launch_timeout_ms(),
            launch_poll_ms: launch_poll_ms(),
            terminate_wait_ms: terminate_wait_ms(),
            kill_grace_ms: kill_grace_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: default_log_file(),
        }
    }
}

fn default_screenshot_path() -> String {
    "screenshots".to_string()
}

fn default_process_hint() -> String {
    "CAB".to_string()
}

fn default_title_hints() -> Vec<String> {
    [
        "CAB Service Platform",
        "CAB.Client.Shell",
        "CABAS",
        "CAB",
        "CSP",
        "CabgroupCSP",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_wait_ms() -> u64 {
    1000
}

fn long_wait_ms() -> u64 {
    3000
}

fn short_wait_ms() -> u64 {
    500
}

fn inter_key_ms() -> u64 {
    30
}

fn action_pause_ms() -> u64 {
    300
}

fn settle_after_attempt_ms() -> u64 {
    5000
}

fn window_timeout_ms() -> u64 {
    30_000
}

fn window_poll_ms() -> u64 {
    500
}

fn launch_timeout_ms() -> u64 {
    15_000
}

fn launch_poll_ms() -> u64 {
    1000
}

fn terminate_wait_ms() -> u64 {
    5000
}

fn kill_grace_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_file() -> String {
    "logs/automation.log".to_string()
}
