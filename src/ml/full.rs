// ============================================================
// Layer 5 — Full (Teacher-Forced) Caption Model
// ============================================================
// Same components as the image-loop model, but in training
// mode the whole shifted caption is pushed through the LSTM in
// one sequence pass instead of step by step:
//
//   inputs[t] = [ caption[t-1] | features ]   (caption[-1] = ones)
//
// That is exactly the sequence of inputs the step-wise loop
// sees under teacher forcing, so both paths agree for the same
// weights. In inference mode there is no ground truth to shift,
// so decoding falls back to the step-wise loop.

use burn::prelude::*;
use std::path::Path;

use crate::data::batcher::GroundTruth;
use crate::domain::{error::CaptionError, mode::Mode, variants::ModelKind};
use crate::ml::{
    decoder::DecodingLoop,
    image_embedder::ImageEmbedder,
    model::{CaptionModelConfig, CaptionNet},
    recurrent::LstmCell,
    word_embedder::{DenseWordEmbedder, DenseWordEmbedderConfig},
};

#[derive(Module, Debug)]
pub struct FullModel<B: Backend> {
    pub image:              ImageEmbedder<B>,
    pub rnn:                LstmCell<B>,
    pub words:              DenseWordEmbedder<B>,
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
}

impl<B: Backend> FullModel<B> {
    fn decoder(&self) -> Result<DecodingLoop, CaptionError> {
        DecodingLoop::new(self.max_caption_length, self.embedding_dim, self.image.output_len())
    }

    /// One LSTM pass over the shifted ground-truth caption.
    fn forward_teacher_forced(
        &self,
        features: Tensor<B, 2>,
        captions: Tensor<B, 3>,
    ) -> Result<Tensor<B, 3>, CaptionError> {
        let decoder = self.decoder()?;
        let [batch, f] = features.dims();
        if f != decoder.feature_dim() {
            return Err(CaptionError::shape("image features", &[batch, decoder.feature_dim()], &[batch, f]));
        }
        decoder.check_captions(&captions, batch)?;

        let (t, e) = (self.max_caption_length, self.embedding_dim);
        let device = features.device();

        let start   = Tensor::<B, 3>::ones([batch, 1, e], &device);
        let shifted = if t > 1 {
            Tensor::cat(vec![start, captions.slice([0..batch, 0..t - 1, 0..e])], 1)
        } else {
            start
        };
        let repeated = Tensor::cat(vec![features.unsqueeze_dim::<3>(1); t], 1); // [batch, t, F]

        let inputs = Tensor::cat(vec![shifted, repeated], 2); // [batch, t, E + F]
        let (outputs, _) = self.rnn.forward_sequence(inputs, None);
        Ok(self.words.forward(outputs))
    }
}

impl<B: Backend> CaptionNet<B> for FullModel<B> {
    fn kind() -> ModelKind {
        ModelKind::Full
    }

    fn init(config: &CaptionModelConfig, device: &B::Device) -> Result<Self, CaptionError> {
        let (image, rnn) = config.init_encoder(device)?;
        let words = DenseWordEmbedderConfig::new(config.hidden_size, config.embedding_dim)
            .with_d_hidden(config.word_hidden)
            .init(device);

        DecodingLoop::bind(
            config.max_caption_length,
            config.embedding_dim,
            image.output_len(),
            &rnn,
            &words,
        )?;

        Ok(Self {
            image,
            rnn,
            words,
            embedding_dim:      config.embedding_dim,
            max_caption_length: config.max_caption_length,
        })
    }

    fn with_backbone_weights(mut self, path: &Path, device: &B::Device) -> Result<Self, CaptionError> {
        self.image = self.image.load_pretrained(path, device)?.no_grad();
        Ok(self)
    }

    fn forward(
        &self,
        images: Tensor<B, 4>,
        truth:  Option<GroundTruth<B>>,
        mode:   Mode,
    ) -> Result<Tensor<B, 3>, CaptionError> {
        let features = self.image.forward(images)?;
        if mode.is_teacher_forced() {
            let truth = truth.ok_or_else(|| {
                CaptionError::config("training mode needs ground-truth captions")
            })?;
            self.forward_teacher_forced(features, truth.embeddings)
        } else {
            self.decoder()?.unroll(&self.rnn, &self.words, features, None, Mode::Inference)
        }
    }
}
