// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the captioning system:
// the error taxonomy, the decoding mode, the architecture
// variants, and a caption record as read from disk.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Error taxonomy shared by every layer that builds or runs a model
pub mod error;

// Training vs. inference decoding mode
pub mod mode;

// Backbone and model-kind tags (string-keyed on the CLI)
pub mod variants;

// An (image, caption) pair before preprocessing
pub mod caption;

// Core abstractions (traits) that other layers implement
pub mod traits;
