// ============================================================
// Layer 5 — Captioner
// ============================================================
// Rebuilds a trained model from its checkpoint directory and
// captions images with the decoder feeding on its own output
// (Mode::Inference).
//
// Each predicted step becomes a word:
//   dense kinds (full, image-loop, raw) → nearest word vector
//   softmax                             → arg-max dictionary index
// Padding and steps with no matching word are dropped.

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::domain::{mode::Mode, traits::WordDecoder, variants::ModelKind};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{image_dims, CaptionModelConfig, CaptionNet};

pub type InferBackend = burn::backend::Wgpu;

pub struct Captioner<M> {
    model:      M,
    image_dims: [usize; 3],
    device:     burn::backend::wgpu::WgpuDevice,
}

impl<M: CaptionNet<InferBackend>> Captioner<M> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, model_cfg: &CaptionModelConfig) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let model  = M::init(model_cfg, &device)?;
        let model  = ckpt.load_model::<InferBackend, M>(model, &device)?;
        tracing::info!("{} model loaded from '{}'", M::kind(), ckpt.dir().display());

        Ok(Self { model, image_dims: image_dims(model_cfg), device })
    }

    /// One caption per preprocessed CHW image.
    pub fn caption(&self, images: &[Vec<f32>], words: &impl WordDecoder) -> Result<Vec<String>> {
        let [c, h, w] = self.image_dims;
        let expected  = c * h * w;
        if let Some(bad) = images.iter().find(|img| img.len() != expected) {
            bail!("image has {} values, expected {}x{}x{} = {}", bad.len(), c, h, w, expected);
        }
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let pixels: Vec<f32> = images.iter().flatten().copied().collect();
        let input = Tensor::<InferBackend, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([images.len(), c, h, w]);

        let output = self.model.predict(input, None, Mode::Inference)?;
        let [batch, steps, width] = output.dims();
        let values: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("cannot read predictions: {e:?}"))?;

        tracing::debug!("Decoded {} images × {} steps of width {}", batch, steps, width);

        Ok(values
            .chunks(steps * width)
            .map(|caption| decode_caption(M::kind(), caption, width, words))
            .collect())
    }
}

/// Turn the [T × width] predictions of one image into text.
pub fn decode_caption(
    kind:   ModelKind,
    steps:  &[f32],
    width:  usize,
    words:  &impl WordDecoder,
) -> String {
    steps
        .chunks(width)
        .filter_map(|step| {
            if kind.predicts_word_indices() {
                let best = step
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)?;
                words.word_at(best)
            } else {
                words.nearest_word(step)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::embeddings::WordVectors;

    fn words() -> WordVectors {
        WordVectors::from_reader("a 1 0\ndog 0 1\nruns -1 0\n".as_bytes(), None).unwrap()
    }

    #[test]
    fn test_dense_steps_decode_to_nearest_words() {
        let steps = [0.9, 0.1, 0.2, 3.0, -2.0, 0.5];
        assert_eq!(decode_caption(ModelKind::ImageLoop, &steps, 2, &words()), "a dog runs");
    }

    #[test]
    fn test_raw_steps_are_word_vectors_too() {
        let steps = [0.0, 2.0, -1.0, 0.1];
        assert_eq!(decode_caption(ModelKind::Raw, &steps, 2, &words()), "dog runs");
    }

    #[test]
    fn test_zero_steps_are_dropped() {
        let steps = [0.0, 0.0, 0.0, 1.0];
        assert_eq!(decode_caption(ModelKind::Full, &steps, 2, &words()), "dog");
    }

    #[test]
    fn test_softmax_steps_use_argmax_and_skip_padding() {
        // Dictionary: <pad>, a, dog, runs
        let steps = [
            0.1, 0.7, 0.1, 0.1,
            0.9, 0.0, 0.1, 0.0,
            0.0, 0.1, 0.1, 0.8,
        ];
        assert_eq!(decode_caption(ModelKind::Softmax, &steps, 4, &words()), "a runs");
    }
}
