// ============================================================
// Layer 5 — Raw-Token Caption Model
// ============================================================
// Captions arrive as word indices. Under teacher forcing each
// index is looked up in a learned embedding table; the decoder
// itself predicts dense word vectors, which are fed back as-is
// in inference mode. Trained with mean squared error against
// the caption's word vectors, like the image-loop model.
//
//   tokens [batch, T] ──► table ──► teacher inputs [batch, T, E]
//                                          │
//   image ──► ImageEmbedder ──► features   │
//                                   │      │
//                                   ▼      ▼
//             DecodingLoop(LstmCell, DenseWordEmbedder)
//                                   │
//                                   ▼
//                         word vectors [batch, T, E]

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};
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
pub struct RawModel<B: Backend> {
    pub image:              ImageEmbedder<B>,
    pub rnn:                LstmCell<B>,
    pub words:              DenseWordEmbedder<B>,
    /// [D, E], one row per dictionary word
    pub table:              Embedding<B>,
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
}

impl<B: Backend> RawModel<B> {
    fn decoder(&self) -> Result<DecodingLoop, CaptionError> {
        DecodingLoop::new(self.max_caption_length, self.embedding_dim, self.image.output_len())
    }

    /// Word indices [batch, T] → table rows [batch, T, E].
    pub fn embed_tokens(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.table.forward(tokens)
    }
}

impl<B: Backend> CaptionNet<B> for RawModel<B> {
    fn kind() -> ModelKind {
        ModelKind::Raw
    }

    fn init(config: &CaptionModelConfig, device: &B::Device) -> Result<Self, CaptionError> {
        let (image, rnn) = config.init_encoder(device)?;
        let words = DenseWordEmbedderConfig::new(config.hidden_size, config.embedding_dim)
            .with_d_hidden(config.word_hidden)
            .init(device);
        let table = EmbeddingConfig::new(config.dictionary_size, config.embedding_dim).init(device);

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
            table,
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
        let decoder  = self.decoder()?;
        let features = self.image.forward(images)?;
        let [batch, _] = features.dims();

        let teacher = match truth {
            Some(truth) if mode.is_teacher_forced() => {
                decoder.check_tokens(&truth.tokens, batch)?;
                Some(self.embed_tokens(truth.tokens))
            }
            _ => None,
        };

        decoder.unroll(&self.rnn, &self.words, features, teacher, mode)
    }
}
