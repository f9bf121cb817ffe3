// ============================================================
// Layer 2 — Normalize Use Case
// ============================================================
// Rescales a GloVe file so the vectors make better regression
// targets, and writes the result in the same text format.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::embeddings::{Normalization, WordVectors};

pub struct NormalizeUseCase {
    input:  PathBuf,
    output: PathBuf,
    method: Normalization,
}

impl NormalizeUseCase {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, method: Normalization) -> Self {
        Self { input: input.into(), output: output.into(), method }
    }

    /// Returns the number of words written.
    pub fn execute(&self) -> Result<usize> {
        let vectors = WordVectors::load(&self.input, None)?;
        let scaled  = vectors.normalized(self.method);

        scaled
            .save(&self.output)
            .with_context(|| format!("Cannot write normalised vectors to '{}'", self.output.display()))?;

        tracing::info!(
            "Wrote {} {:?}-normalised vectors to '{}'",
            scaled.len() - 1,
            self.method,
            self.output.display()
        );
        Ok(scaled.len() - 1)
    }
}
