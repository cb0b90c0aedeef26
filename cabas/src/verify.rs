//! Classifies the application state after a login attempt.
//!
//! Evidence is checked in a fixed precedence: window title failure
//! keywords, window title success keywords, on-screen success text,
//! on-screen failure text, then a whole-screen scan for leftover login
//! form markers. A title that still says "login" outranks a stray
//! "Dashboard" somewhere on screen.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::engine::DesktopEngine;
use crate::locator::ElementLocator;
use crate::window::WindowTracker;

/// Post-attempt classification. `Ambiguous` means no evidence channel was
/// observable at all, not that the evidence conflicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failure,
    Ambiguous,
}

/// Keyword sets driving verification, configurable per deployment locale.
/// Title keywords are matched case-insensitively; screen text goes through
/// the OCR substring search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationKeywords {
    #[serde(default = "default_title_failure")]
    pub title_failure: Vec<String>,
    #[serde(default = "default_title_success")]
    pub title_success: Vec<String>,
    #[serde(default = "default_screen_success")]
    pub screen_success: Vec<String>,
    #[serde(default = "default_screen_failure")]
    pub screen_failure: Vec<String>,
    /// Markers of a still-visible login form, scanned over the whole
    /// screen as the last evidence source.
    #[serde(default = "default_login_markers")]
    pub login_markers: Vec<String>,
}

impl Default for VerificationKeywords {
    fn default() -> Self {
        Self {
            title_failure: default_title_failure(),
            title_success: default_title_success(),
            screen_success: default_screen_success(),
            screen_failure: default_screen_failure(),
            login_markers: default_login_markers(),
        }
    }
}

fn default_title_failure() -> Vec<String> {
    ["login", "sign in", "authentication", "error", "invalid"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_title_success() -> Vec<String> {
    ["dashboard", "main", "home", "workspace", "platform"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_screen_success() -> Vec<String> {
    [
        "Welcome", "Dashboard", "Home", "Menu", "Logout", "Profile", "Settings",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_screen_failure() -> Vec<String> {
    ["Invalid", "Error", "Failed", "Incorrect", "Try again"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_login_markers() -> Vec<String> {
    ["Username", "Password", "Login", "Sign in"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub struct Verifier {
    engine: Arc<dyn DesktopEngine>,
    locator: ElementLocator,
    keywords: VerificationKeywords,
}

impl Verifier {
    pub fn new(
        engine: Arc<dyn DesktopEngine>,
        locator: ElementLocator,
        keywords: VerificationKeywords,
    ) -> Self {
        Self {
            engine,
            locator,
            keywords,
        }
    }

    /// Re-resolves the window and classifies the current state.
    ///
    /// The final fallback is a closed-world assumption: when neither
    /// success nor failure markers are observable anywhere, the login is
    /// treated as successful. Layouts showing none of the known keywords
    /// will be misreported; tune [`VerificationKeywords`] per deployment.
    #[instrument(skip_all)]
    pub fn verify(&self, tracker: &mut WindowTracker) -> Verdict {
        tracker.refresh();
        let window = tracker.current().cloned();

        if let Some(window) = &window {
            let title = window.title.to_lowercase();
            if let Some(keyword) = contains_any(&title, &self.keywords.title_failure) {
                info!(keyword, title = %window.title, "title still names the login flow");
                return Verdict::Failure;
            }
            if let Some(keyword) = contains_any(&title, &self.keywords.title_success) {
                info!(keyword, title = %window.title, "title names a logged-in view");
                return Verdict::Success;
            }
        }

        // Without a window or a capturable screen there is nothing to
        // observe; report that instead of guessing.
        if window.is_none() && self.engine.capture_screen().is_err() {
            warn!("no window and no screen capture, login outcome unobservable");
            return Verdict::Ambiguous;
        }

        let region = window.as_ref().map(|w| w.region);
        for text in &self.keywords.screen_success {
            if !self.locator.locate_by_text(text, region).is_empty() {
                info!(%text, "success indicator visible");
                return Verdict::Success;
            }
        }
        for text in &self.keywords.screen_failure {
            if !self.locator.locate_by_text(text, region).is_empty() {
                info!(%text, "failure indicator visible");
                return Verdict::Failure;
            }
        }
        // The form may sit outside a mis-tracked window rectangle, so this
        // last scan ignores the region.
        for marker in &self.keywords.login_markers {
            if !self.locator.locate_by_text(marker, None).is_empty() {
                info!(%marker, "login form still visible");
                return Verdict::Failure;
            }
        }

        info!("no contrary evidence, treating login as successful");
        Verdict::Success
    }
}

fn contains_any<'a>(haystack: &str, needles: &'a [String]) -> Option<&'a str> {
    needles
        .iter()
        .find(|needle| haystack.contains(&needle.to_lowercase()))
        .map(|needle| needle.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_case_insensitive_on_the_title_side() {
        let keywords = default_title_failure();
        assert_eq!(
            contains_any("cab service platform - login", &keywords),
            Some("login")
        );
        assert_eq!(contains_any("cabas workspace", &keywords), None);
    }

    #[test]
    fn default_sets_cover_the_known_client_vocabulary() {
        let keywords = VerificationKeywords::default();
        assert!(keywords.title_failure.iter().any(|k| k == "authentication"));
        assert!(keywords.title_success.iter().any(|k| k == "dashboard"));
        assert!(keywords.screen_failure.iter().any(|k| k == "Try again"));
        assert!(keywords.login_markers.iter().any(|k| k == "Sign in"));
    }
}
