//! Maps logical UI elements to screen coordinates.
//!
//! Two channels: normalized cross-correlation against image templates, and
//! word-level OCR scanned for substrings. Both treat absence as data ("not
//! found"), never as an error; upstream strategies decide what a miss
//! means.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::engine::{DesktopEngine, WindowSnapshot};
use crate::geometry::{Point, Region};

/// Tunables for visual search. Label vocabularies carry the deployment's
/// locales (English plus Swedish by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default = "default_username_labels")]
    pub username_labels: Vec<String>,
    #[serde(default = "default_password_labels")]
    pub password_labels: Vec<String>,
    /// Horizontal distance from a field label to the input box next to it.
    #[serde(default = "default_field_offset_x")]
    pub field_offset_x: i32,
    /// Vertical offsets from the window center tried when no label is
    /// readable; the first becomes the username field, the second the
    /// password field.
    #[serde(default = "default_center_offsets")]
    pub center_field_offsets_y: Vec<i32>,
    /// OCR tokens at or below this confidence are treated as noise.
    #[serde(default = "default_min_confidence")]
    pub min_text_confidence: f32,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            username_labels: default_username_labels(),
            password_labels: default_password_labels(),
            field_offset_x: default_field_offset_x(),
            center_field_offsets_y: default_center_offsets(),
            min_text_confidence: default_min_confidence(),
            ocr_language: default_ocr_language(),
        }
    }
}

fn default_username_labels() -> Vec<String> {
    ["username", "user", "email", "login", "användarnamn"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_password_labels() -> Vec<String> {
    ["password", "pass", "lösenord"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_field_offset_x() -> i32 {
    100
}

fn default_center_offsets() -> Vec<i32> {
    vec![-60, -20, 20]
}

fn default_min_confidence() -> f32 {
    30.0
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

/// Detected login field coordinates. Empty means detection failed
/// entirely and the caller should fall back to blind strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginFields {
    pub username: Option<Point>,
    pub password: Option<Point>,
}

impl LoginFields {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

pub struct ElementLocator {
    engine: Arc<dyn DesktopEngine>,
    config: LocatorConfig,
}

impl ElementLocator {
    pub fn new(engine: Arc<dyn DesktopEngine>, config: LocatorConfig) -> Self {
        Self { engine, config }
    }

    /// Finds `template_path` on screen (or within `region`) and returns
    /// the center of the best match when its normalized correlation
    /// reaches `confidence`.
    #[instrument(skip(self))]
    pub fn locate_by_image(
        &self,
        template_path: &Path,
        confidence: f32,
        region: Option<Region>,
    ) -> Option<Point> {
        let template = match image::open(template_path) {
            Ok(template) => template.to_luma8(),
            Err(e) => {
                warn!("cannot load template {}: {e}", template_path.display());
                return None;
            }
        };
        let (capture, origin) = self.capture(region)?;
        let haystack = image::DynamicImage::ImageRgba8(capture).to_luma8();
        if template.width() > haystack.width() || template.height() > haystack.height() {
            debug!(
                template = %template_path.display(),
                "template larger than the searched area"
            );
            return None;
        }

        let scores = match_template(
            &haystack,
            &template,
            MatchTemplateMethod::CrossCorrelationNormalized,
        );
        let extremes = find_extremes(&scores);
        if extremes.max_value < confidence {
            debug!(
                best = extremes.max_value,
                confidence, "no template match above threshold"
            );
            return None;
        }
        let (hit_x, hit_y) = extremes.max_value_location;
        let center = Point::new(
            origin.x + hit_x as i32 + template.width() as i32 / 2,
            origin.y + hit_y as i32 + template.height() as i32 / 2,
        );
        debug!(score = extremes.max_value, at = ?center, "template matched");
        Some(center)
    }

    /// OCR pass over the screen (or `region`) returning the centers of
    /// every confident token containing `text`, case-insensitively, in
    /// absolute screen coordinates. Empty when nothing matches or OCR is
    /// unavailable; never an error.
    #[instrument(skip(self))]
    pub fn locate_by_text(&self, text: &str, region: Option<Region>) -> Vec<Point> {
        let needle = text.to_lowercase();
        let Some((capture, origin)) = self.capture(region) else {
            return Vec::new();
        };
        let words = match self.engine.recognize_words(&capture) {
            Ok(words) => words,
            Err(e) => {
                debug!("OCR unavailable: {e}");
                return Vec::new();
            }
        };

        let mut hits = Vec::new();
        for word in words {
            if word.confidence <= self.config.min_text_confidence {
                continue;
            }
            if !word.text.to_lowercase().contains(&needle) {
                continue;
            }
            hits.push(word.center().offset(origin.x, origin.y));
        }
        if !hits.is_empty() {
            debug!(count = hits.len(), first = ?hits[0], "text located");
        }
        hits
    }

    /// Two-tier login field detection: read field labels inside the window
    /// and offset to the adjacent input boxes, else assume the stacked
    /// center layout of the login form. Empty only when no window geometry
    /// is available at all.
    #[instrument(skip_all)]
    pub fn find_login_fields(&self, window: Option<&WindowSnapshot>) -> LoginFields {
        let Some(window) = window else {
            debug!("no window geometry, field detection impossible");
            return LoginFields::default();
        };
        let region = window.region;
        let mut fields = LoginFields::default();

        for label in &self.config.username_labels {
            if let Some(hit) = self.locate_by_text(label, Some(region)).into_iter().next() {
                fields.username = Some(hit.offset(self.config.field_offset_x, 0));
                debug!(label, at = ?fields.username, "username field located by label");
                break;
            }
        }
        for label in &self.config.password_labels {
            if let Some(hit) = self.locate_by_text(label, Some(region)).into_iter().next() {
                fields.password = Some(hit.offset(self.config.field_offset_x, 0));
                debug!(label, at = ?fields.password, "password field located by label");
                break;
            }
        }

        if fields.is_empty() {
            let center = region.center();
            let mut offsets = self.config.center_field_offsets_y.iter();
            fields.username = offsets.next().map(|dy| center.offset(0, *dy));
            fields.password = offsets.next().map(|dy| center.offset(0, *dy));
            debug!(?fields, "no labels readable, using window-center layout");
        }
        fields
    }

    /// Captures the search area, returning the pixels and the screen
    /// coordinate of their top-left corner.
    fn capture(&self, region: Option<Region>) -> Option<(RgbaImage, Point)> {
        match region {
            Some(region) => {
                let (width, height) = match self.engine.screen_size() {
                    Ok(size) => size,
                    Err(e) => {
                        debug!("screen size unavailable: {e}");
                        return None;
                    }
                };
                let Some(clipped) = region.clip_to_screen(width, height) else {
                    debug!(?region, "search region lies entirely off screen");
                    return None;
                };
                match self.engine.capture_region(clipped) {
                    Ok(image) => Some((image, Point::new(clipped.left, clipped.top))),
                    Err(e) => {
                        debug!("region capture failed: {e}");
                        None
                    }
                }
            }
            None => match self.engine.capture_screen() {
                Ok(image) => Some((image, Point::new(0, 0))),
                Err(e) => {
                    debug!("screen capture failed: {e}");
                    None
                }
            },
        }
    }
}
