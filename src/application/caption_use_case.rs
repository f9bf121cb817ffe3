// ============================================================
// Layer 2 — Caption Use Case
// ============================================================
// Describes images with a trained checkpoint:
//   1. Read train_config.json to rebuild the architecture
//   2. Reload the same word vectors the model was trained on
//   3. Preprocess each image exactly as during training
//   4. Decode with the model feeding on its own predictions

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{embeddings::WordVectors, preprocessor::ImagePreprocessor};
use crate::domain::variants::ModelKind;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    full::FullModel,
    image_loop::ImageLoopModel,
    inferencer::{Captioner, InferBackend},
    model::{CaptionModelConfig, CaptionNet},
    raw::RawModel,
    softmax::SoftmaxModel,
};

pub struct CaptionUseCase {
    checkpoint_dir: PathBuf,
}

impl CaptionUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into() }
    }

    /// (image path, caption) for every readable image, in input order.
    pub fn caption(&self, images: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
        let ckpt      = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg       = ckpt.load_config()?;
        let vectors   = cfg.load_vectors()?;
        let model_cfg = cfg.model_config();
        let prep      = ImagePreprocessor::new(cfg.image_shape())?;

        let mut paths  = Vec::new();
        let mut pixels = Vec::new();
        for path in images {
            match prep.load(path) {
                Ok(p) => {
                    paths.push(path.clone());
                    pixels.push(p);
                }
                Err(e) => tracing::warn!("Skipping '{}': {:#}", path.display(), e),
            }
        }

        let captions = match cfg.model_kind {
            ModelKind::Full      => run::<FullModel<InferBackend>>(&ckpt, &model_cfg, &pixels, &vectors)?,
            ModelKind::ImageLoop => run::<ImageLoopModel<InferBackend>>(&ckpt, &model_cfg, &pixels, &vectors)?,
            ModelKind::Raw       => run::<RawModel<InferBackend>>(&ckpt, &model_cfg, &pixels, &vectors)?,
            ModelKind::Softmax   => run::<SoftmaxModel<InferBackend>>(&ckpt, &model_cfg, &pixels, &vectors)?,
        };

        Ok(paths.into_iter().zip(captions).collect())
    }
}

fn run<M: CaptionNet<InferBackend>>(
    ckpt:      &CheckpointManager,
    model_cfg: &CaptionModelConfig,
    pixels:    &[Vec<f32>],
    words:     &WordVectors,
) -> Result<Vec<String>> {
    Captioner::<M>::from_checkpoint(ckpt, model_cfg)?.caption(pixels, words)
}

