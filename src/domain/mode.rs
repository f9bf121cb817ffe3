// ============================================================
// Layer 3 — Decoding Mode
// ============================================================
// Selects where the decoder's next input comes from:
//
//   Training  → the ground-truth caption token (teacher forcing)
//   Inference → the model's own previous prediction
//
// The mode is passed into every forward call. Nothing in the
// crate keeps it in global state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Training,
    Inference,
}

impl Mode {
    /// True when ground-truth tokens drive the next step.
    pub fn is_teacher_forced(self) -> bool {
        matches!(self, Mode::Training)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Training  => write!(f, "training"),
            Mode::Inference => write!(f, "inference"),
        }
    }
}
