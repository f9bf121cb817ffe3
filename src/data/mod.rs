// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a caption manifest on disk to tensor batches.
//
//   captions.json
//       │
//       ▼
//   JsonManifest        → (image path, caption) records
//       │
//       ▼
//   ImagePreprocessor   → CHW floats, ImageNet-normalised
//   CaptionTokenizer    → T word indices (WordLevel over the vector vocabulary)
//       │
//       ▼
//   CaptionDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   CaptionBatcher      → images, word vectors and indices as tensors
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the JSON list of captioned images
pub mod manifest;

/// GloVe word vectors, nearest-word lookup and normalisation
pub mod embeddings;

/// Image decoding and caption tokenisation
pub mod preprocessor;

/// Implements Burn's Dataset trait for caption samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded shuffle and train/validation split
pub mod splitter;
