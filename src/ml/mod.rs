// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules and the loops that drive them.
//
//   image_embedder.rs — ResNet backbone: image → feature vector
//   word_embedder.rs  — hidden state → word vector (or logits)
//   recurrent.rs      — LSTM cell stepped one token at a time
//   decoder.rs        — the unrolled decoding loop, switching
//                       between teacher forcing and self-feeding
//
//   model.rs          — shared config and the CaptionNet trait
//   image_loop.rs     — feature re-injected at every step
//   full.rs           — one LSTM pass over the shifted caption
//   raw.rs            — word indices in, word vectors out
//   softmax.rs        — dictionary logits, argmax fed back
//
//   loss.rs           — MSE or cross entropy per model kind
//   assembler.rs      — config → model + optimiser + loss
//   trainer.rs        — epoch loop, validation, checkpoints
//   inferencer.rs     — checkpoint → captions
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vinyals et al. (2015) Show and Tell

/// Hyperparameters and the trait every caption model implements
pub mod model;

/// ResNet50 / ResNet152 image encoder
pub mod image_embedder;

/// Single-step LSTM cell with explicit state
pub mod recurrent;

/// Maps recurrent output to the word space
pub mod word_embedder;

/// Unrolled decoding loop
pub mod decoder;

/// The four model kinds
pub mod image_loop;
pub mod full;
pub mod raw;
pub mod softmax;

/// Loss selection and computation
pub mod loss;

/// Builds a trainable unit from a configuration
pub mod assembler;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Captioning from a trained checkpoint
pub mod inferencer;

#[cfg(test)]
pub mod testing;
