// ============================================================
// Layer 5 — Test Fixtures
// ============================================================
// Small models and batches shared by the model tests. A full
// 224×224 ResNet50 is far too slow for unit tests; these keep
// every layer but shrink the widths.

use burn::{prelude::*, tensor::Distribution};

use crate::data::batcher::{CaptionBatch, GroundTruth};
use crate::domain::variants::{Backbone, ModelKind};
use crate::ml::model::CaptionModelConfig;

/// 32×32 RGB input, ResNet50 at width 2 (F = 64), E = 4, T = 3, D = 6.
pub fn tiny_config(kind: ModelKind) -> CaptionModelConfig {
    CaptionModelConfig::new(kind, Backbone::ResNet50, [32, 32, 3], 4, 3, 6)
        .with_backbone_width(2)
        .with_hidden_size(8)
        .with_word_hidden(5)
        .with_dropout(0.0)
}

pub fn tiny_batch<B: Backend>(cfg: &CaptionModelConfig, n: usize, device: &B::Device) -> CaptionBatch<B> {
    let [h, w, c] = cfg.image_shape;
    let t = cfg.max_caption_length;

    let images     = Tensor::random([n, c, h, w], Distribution::Uniform(0.0, 1.0), device);
    let embeddings = Tensor::random([n, t, cfg.embedding_dim], Distribution::Uniform(-1.0, 1.0), device);

    let ids: Vec<i32> = (0..n * t)
        .map(|i| (i % (cfg.dictionary_size - 1) + 1) as i32)
        .collect();
    let tokens = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([n, t]);

    CaptionBatch {
        images,
        truth: GroundTruth { embeddings, tokens },
    }
}
