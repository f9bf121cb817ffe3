// ============================================================
// Layer 5 — Softmax Caption Model
// ============================================================
// Captions are word indices instead of word vectors. Each step
// projects the LSTM output onto the dictionary; the next step
// is fed the embedding of the ground-truth word (training) or
// of the most likely predicted word (inference). The same
// embedding table serves both paths.
//
// Output: word probabilities [batch, T, D].
// Loss:   cross entropy over all steps, padding index ignored.

use burn::{prelude::*, tensor::activation::softmax};
use std::path::Path;

use crate::data::batcher::GroundTruth;
use crate::domain::{error::CaptionError, mode::Mode, variants::ModelKind};
use crate::ml::{
    decoder::DecodingLoop,
    image_embedder::ImageEmbedder,
    model::{CaptionModelConfig, CaptionNet},
    recurrent::LstmCell,
    word_embedder::{SoftmaxWordHead, SoftmaxWordHeadConfig},
};

#[derive(Module, Debug)]
pub struct SoftmaxModel<B: Backend> {
    pub image:              ImageEmbedder<B>,
    pub rnn:                LstmCell<B>,
    pub head:               SoftmaxWordHead<B>,
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
}

impl<B: Backend> SoftmaxModel<B> {
    fn decoder(&self) -> Result<DecodingLoop, CaptionError> {
        DecodingLoop::new(self.max_caption_length, self.embedding_dim, self.image.output_len())
    }
}

impl<B: Backend> CaptionNet<B> for SoftmaxModel<B> {
    fn kind() -> ModelKind {
        ModelKind::Softmax
    }

    fn init(config: &CaptionModelConfig, device: &B::Device) -> Result<Self, CaptionError> {
        let (image, rnn) = config.init_encoder(device)?;
        let head = SoftmaxWordHeadConfig::new(
            config.hidden_size,
            config.dictionary_size,
            config.embedding_dim,
        )
        .init(device);

        DecodingLoop::bind(
            config.max_caption_length,
            config.embedding_dim,
            image.output_len(),
            &rnn,
            &head,
        )?;

        Ok(Self {
            image,
            rnn,
            head,
            embedding_dim:      config.embedding_dim,
            max_caption_length: config.max_caption_length,
        })
    }

    fn with_backbone_weights(mut self, path: &Path, device: &B::Device) -> Result<Self, CaptionError> {
        self.image = self.image.load_pretrained(path, device)?.no_grad();
        Ok(self)
    }

    /// Unnormalised scores [batch, T, D].
    fn forward(
        &self,
        images: Tensor<B, 4>,
        truth:  Option<GroundTruth<B>>,
        mode:   Mode,
    ) -> Result<Tensor<B, 3>, CaptionError> {
        let decoder  = self.decoder()?;
        let features = self.image.forward(images)?;
        let [batch, _] = features.dims();

        let teacher = match truth {
            Some(truth) if mode.is_teacher_forced() => {
                decoder.check_tokens(&truth.tokens, batch)?;
                Some(self.head.embed_tokens(truth.tokens))
            }
            _ => None,
        };

        decoder.unroll(&self.rnn, &self.head, features, teacher, mode)
    }

    /// Word probabilities [batch, T, D].
    fn predict(
        &self,
        images: Tensor<B, 4>,
        truth:  Option<GroundTruth<B>>,
        mode:   Mode,
    ) -> Result<Tensor<B, 3>, CaptionError> {
        Ok(softmax(self.forward(images, truth, mode)?, 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{
        loss::LossKind,
        testing::{tiny_batch, tiny_config},
    };
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_predictions_are_distributions_over_the_dictionary() {
        let device = Default::default();
        let cfg    = tiny_config(ModelKind::Softmax);
        let model  = SoftmaxModel::<TestBackend>::init(&cfg, &device).unwrap();
        let batch  = tiny_batch::<TestBackend>(&cfg, 2, &device);

        let probs = model.predict(batch.images, None, Mode::Inference).unwrap();
        assert_eq!(probs.dims(), [2, cfg.max_caption_length, cfg.dictionary_size]);

        let sums = probs.sum_dim(2).into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cross_entropy_loss() {
        let device = Default::default();
        let cfg    = tiny_config(ModelKind::Softmax);
        let model  = SoftmaxModel::<TestBackend>::init(&cfg, &device).unwrap();
        let batch  = tiny_batch::<TestBackend>(&cfg, 2, &device);

        let loss   = LossKind::for_model(ModelKind::Softmax);
        let taught = loss.batch_loss(&model, batch.clone(), Mode::Training).unwrap().into_scalar().elem::<f64>();
        let free   = loss.batch_loss(&model, batch, Mode::Inference).unwrap().into_scalar().elem::<f64>();
        assert!(taught.is_finite() && taught > 0.0);
        assert!(free.is_finite() && free > 0.0);
    }

    #[test]
    fn test_wrong_token_length_is_rejected() {
        let device = Default::default();
        let cfg    = tiny_config(ModelKind::Softmax);
        let model  = SoftmaxModel::<TestBackend>::init(&cfg, &device).unwrap();
        let mut batch = tiny_batch::<TestBackend>(&cfg, 1, &device);
        batch.truth.tokens = Tensor::zeros([1, 1], &device);

        let err = model.predict(batch.images, Some(batch.truth), Mode::Training).unwrap_err();
        assert!(matches!(err, CaptionError::ShapeMismatch { what: "caption tokens", .. }));
    }
}
