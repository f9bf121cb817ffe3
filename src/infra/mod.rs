// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by both training and
// captioning:
//
//   checkpoint.rs — Saving and loading model weights
//                   (Burn's CompactRecorder) plus the TrainConfig
//                   JSON that lets inference rebuild the model.
//
//   metrics.rs    — Per-epoch losses appended to a CSV file.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
