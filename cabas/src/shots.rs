//! Diagnostic screenshots at lifecycle checkpoints.
//!
//! These exist for the operator reading logs after a failed run. Nothing
//! consumes them programmatically, so every failure here is logged and
//! swallowed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::DesktopEngine;

pub struct ShotSink {
    engine: Arc<dyn DesktopEngine>,
    dir: PathBuf,
}

impl ShotSink {
    /// Creates the sink and its target directory.
    pub fn new(engine: Arc<dyn DesktopEngine>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("cannot create screenshot directory {}: {e}", dir.display());
        }
        Self { engine, dir }
    }

    /// Captures the screen into `<dir>/<label>_<timestamp>.png` and
    /// returns the path when it worked.
    pub fn save(&self, label: &str) -> Option<PathBuf> {
        let image = match self.engine.capture_screen() {
            Ok(image) => image,
            Err(e) => {
                warn!(label, "screenshot capture failed: {e}");
                return None;
            }
        };
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let path = self.dir.join(format!("{label}_{stamp}.png"));
        if let Err(e) = image.save(&path) {
            warn!(label, "cannot write screenshot {}: {e}", path.display());
            return None;
        }
        debug!(label, path = %path.display(), "screenshot saved");
        Some(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
