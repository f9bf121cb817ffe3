// ============================================================
// Layer 5 — Image-Loop Caption Model
// ============================================================
// ResNet features are re-read at every decoding step; the LSTM
// is unrolled step by step and each step's word vector is
// either replaced by the ground truth (training) or fed back
// (inference). Trained with mean squared error against the
// caption's word vectors.
//
//   image ──► ImageEmbedder ──► features [batch, F]
//                                   │
//                                   ▼
//             DecodingLoop(LstmCell, DenseWordEmbedder)
//                                   │
//                                   ▼
//                         word vectors [batch, T, E]

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
pub struct ImageLoopModel<B: Backend> {
    pub image:              ImageEmbedder<B>,
    pub rnn:                LstmCell<B>,
    pub words:              DenseWordEmbedder<B>,
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
}

impl<B: Backend> ImageLoopModel<B> {
    fn decoder(&self) -> Result<DecodingLoop, CaptionError> {
        DecodingLoop::new(self.max_caption_length, self.embedding_dim, self.image.output_len())
    }
}

impl<B: Backend> CaptionNet<B> for ImageLoopModel<B> {
    fn kind() -> ModelKind {
        ModelKind::ImageLoop
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
        let captions = truth.map(|t| t.embeddings);
        self.decoder()?.unroll(&self.rnn, &self.words, features, captions, mode)
    }
}
