// ============================================================
// Layer 3 — CaptionRecord Domain Type
// ============================================================
// One labelled training example as it appears in a manifest:
// an image file and the sentence that describes it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// Path to the image file
    pub image: PathBuf,

    /// The human-written caption
    pub caption: String,
}

impl CaptionRecord {
    pub fn new(image: impl Into<PathBuf>, caption: impl Into<String>) -> Self {
        Self {
            image:   image.into(),
            caption: caption.into(),
        }
    }

    /// Number of whitespace-separated words in the caption
    pub fn word_count(&self) -> usize {
        self.caption.split_whitespace().count()
    }
}
