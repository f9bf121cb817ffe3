// ============================================================
// Layer 4 — Caption Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<CaptionSample>
// into tensors for the model:
//
//   images      [N, C, H, W]  from the CHW floats of each sample
//   embeddings  [N, T, E]     word vector of every token
//   tokens      [N, T]        the raw word indices
//
// Padding tokens look up row 0 of the word vectors, which is
// the zero vector.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::sync::Arc;

use crate::data::{dataset::CaptionSample, embeddings::WordVectors};

// ─── Batch types ──────────────────────────────────────────────────────────────
/// Ground-truth caption in the two forms the model kinds consume.
#[derive(Debug, Clone)]
pub struct GroundTruth<B: Backend> {
    /// [batch, T, E]
    pub embeddings: Tensor<B, 3>,
    /// [batch, T]
    pub tokens:     Tensor<B, 2, Int>,
}

#[derive(Debug, Clone)]
pub struct CaptionBatch<B: Backend> {
    /// [batch, C, H, W]
    pub images: Tensor<B, 4>,
    pub truth:  GroundTruth<B>,
}

// ─── CaptionBatcher ───────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct CaptionBatcher<B: Backend> {
    pub device:     B::Device,
    pub vectors:    Arc<WordVectors>,
    /// (C, H, W) of every image
    pub image_dims: [usize; 3],
}

impl<B: Backend> CaptionBatcher<B> {
    pub fn new(device: B::Device, vectors: Arc<WordVectors>, image_dims: [usize; 3]) -> Self {
        Self { device, vectors, image_dims }
    }
}

impl<B: Backend> Batcher<CaptionSample, CaptionBatch<B>> for CaptionBatcher<B> {
    fn batch(&self, items: Vec<CaptionSample>) -> CaptionBatch<B> {
        let batch_size = items.len();
        let [c, h, w]  = self.image_dims;
        // All samples share T (pre-padded)
        let seq_len    = items.first().map_or(0, |s| s.tokens.len());
        let dim        = self.vectors.dim();

        // ── Images ────────────────────────────────────────────────────────────
        let pixels: Vec<f32> = items.iter().flat_map(|s| s.image.iter().copied()).collect();

        // ── Tokens and their vectors ──────────────────────────────────────────
        let ids: Vec<i32> = items
            .iter()
            .flat_map(|s| s.tokens.iter().map(|&t| t as i32))
            .collect();
        let vectors: Vec<f32> = items
            .iter()
            .flat_map(|s| s.tokens.iter())
            .flat_map(|&t| self.vectors.vector(t).iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, c, h, w]);
        let embeddings = Tensor::<B, 1>::from_floats(vectors.as_slice(), &self.device)
            .reshape([batch_size, seq_len, dim]);
        let tokens = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        CaptionBatch {
            images,
            truth: GroundTruth { embeddings, tokens },
        }
    }
}
