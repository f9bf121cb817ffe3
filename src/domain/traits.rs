// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only depends on these traits, so the
// place captions come from can change without touching the
// training workflow.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::caption::CaptionRecord;

// ─── CaptionSource ────────────────────────────────────────────────────────────
/// Any component that can produce labelled (image, caption) pairs.
///
/// Implementations:
///   - JsonManifest → reads a JSON list of records from disk
pub trait CaptionSource {
    /// Load every available record from this source.
    fn load_all(&self) -> Result<Vec<CaptionRecord>>;
}

// ─── WordDecoder ──────────────────────────────────────────────────────────────
/// Turns one predicted step back into a word.
///
/// Implementations:
///   - WordVectors → nearest neighbour for embedding outputs,
///                   arg-max lookup for dictionary outputs
pub trait WordDecoder {
    /// Word whose vector is closest to `embedding`, if any.
    fn nearest_word(&self, embedding: &[f32]) -> Option<&str>;

    /// Word stored at dictionary index `index`, if any.
    fn word_at(&self, index: usize) -> Option<&str>;
}
