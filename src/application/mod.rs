// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal per
// CLI command. No model math and no printing here; the use
// cases only decide what runs in which order.
//
// Reference: Clean Architecture pattern

// Training on a caption manifest
pub mod train_use_case;

// Captioning images with a trained checkpoint
pub mod caption_use_case;

// Rescaling word vectors
pub mod normalize_use_case;
