// ============================================================
// Layer 3 — Architecture Variants
// ============================================================
// Two tagged choices pick the network that gets built:
//
//   Backbone  — depth of the ResNet image encoder
//   ModelKind — how the recurrent decoder is fed and trained
//
// Both parse from the lowercase names used on the command line
// and in train_config.json ("resnet50", "image-loop", ...).

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::CaptionError;

// ─── Backbone ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
    ResNet50,
    ResNet152,
}

impl Backbone {
    /// Number of bottleneck blocks in each of the four stages.
    pub fn stage_depths(self) -> [usize; 4] {
        match self {
            Backbone::ResNet50  => [3, 4, 6, 3],
            Backbone::ResNet152 => [3, 8, 36, 3],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backbone::ResNet50  => "resnet50",
            Backbone::ResNet152 => "resnet152",
        }
    }
}

impl FromStr for Backbone {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resnet50"  => Ok(Backbone::ResNet50),
            "resnet152" => Ok(Backbone::ResNet152),
            other => Err(CaptionError::config(format!(
                "unknown backbone '{other}' (expected resnet50 or resnet152)"
            ))),
        }
    }
}

impl fmt::Display for Backbone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── ModelKind ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Teacher-forced over the whole sequence in one recurrent pass.
    Full,
    /// Step-wise unrolled decoder that re-reads the image every step.
    ImageLoop,
    /// Step-wise decoder fed word indices through a learned table,
    /// predicting word vectors.
    Raw,
    /// Step-wise decoder over word indices with a softmax output.
    Softmax,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Full      => "full",
            ModelKind::ImageLoop => "image-loop",
            ModelKind::Raw       => "raw",
            ModelKind::Softmax   => "softmax",
        }
    }

    /// Whether captions are fed to the model as word indices
    /// rather than as word vectors.
    pub fn uses_word_indices(self) -> bool {
        matches!(self, ModelKind::Raw | ModelKind::Softmax)
    }

    /// Whether each step predicts a distribution over the dictionary
    /// rather than a word vector.
    pub fn predicts_word_indices(self) -> bool {
        matches!(self, ModelKind::Softmax)
    }
}

impl FromStr for ModelKind {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "full"       => Ok(ModelKind::Full),
            "image-loop" => Ok(ModelKind::ImageLoop),
            "raw" | "raw-token" => Ok(ModelKind::Raw),
            "softmax"    => Ok(ModelKind::Softmax),
            other => Err(CaptionError::config(format!(
                "unknown model kind '{other}' (expected full, image-loop, raw or softmax)"
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
