// ============================================================
// Layer 3 — Caption Errors
// ============================================================
// Every failure that can happen while a model is being put
// together is one of four kinds. All of them are immediate and
// local; the caller decides whether to retry with another
// configuration.
//
// Reference: thiserror crate documentation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    /// Collaborators disagree on a dimension or a value is out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A tensor did not have the shape the model was built for.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what:     &'static str,
        expected: Vec<usize>,
        actual:   Vec<usize>,
    },

    /// The request is well-formed but this model family cannot honour it.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// An external resource (pretrained weights, word vectors) is missing.
    #[error("resource error: {0}")]
    Resource(String),
}

impl CaptionError {
    pub fn config(msg: impl Into<String>) -> Self {
        CaptionError::Configuration(msg.into())
    }

    pub fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        CaptionError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual:   actual.to_vec(),
        }
    }
}
