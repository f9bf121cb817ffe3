// ============================================================
// Layer 5 — Caption Model Configuration
// ============================================================
// Hyperparameters shared by every model kind, plus the trait
// the trainer and the inferencer use to drive any of them.
//
//   image_shape        (height, width, channels) of the input
//   embedding_dim      E — width of one word vector
//   max_caption_length T — number of decoding steps
//   dictionary_size    D — number of words (raw and softmax kinds)
//   hidden_size        H — LSTM width
//
// Reference: Burn Book §3 (Config)

use burn::prelude::*;
use std::path::Path;

use crate::data::batcher::GroundTruth;
use crate::domain::{
    error::CaptionError,
    mode::Mode,
    variants::{Backbone, ModelKind},
};
use crate::ml::{
    image_embedder::{ImageEmbedder, ImageEmbedderConfig},
    recurrent::{LstmCell, LstmCellConfig},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CaptionModelConfig {
    pub kind:               ModelKind,
    pub backbone:           Backbone,
    pub image_shape:        [usize; 3],
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
    pub dictionary_size:    usize,
    #[config(default = 64)]
    pub backbone_width:     usize,
    #[config(default = 150)]
    pub hidden_size:        usize,
    #[config(default = 100)]
    pub word_hidden:        usize,
    #[config(default = 0.2)]
    pub dropout:            f64,
    #[config(default = 1e-8)]
    pub regularizer:        f64,
}

impl CaptionModelConfig {
    /// Reject values that can never produce a working model.
    pub fn validate(&self) -> Result<(), CaptionError> {
        let [h, w, c] = self.image_shape;
        if h == 0 || w == 0 || c == 0 {
            return Err(CaptionError::config(format!(
                "image_shape {:?} has a zero dimension", self.image_shape
            )));
        }
        if self.max_caption_length == 0 {
            return Err(CaptionError::config("max_caption_length must be at least 1"));
        }
        if self.embedding_dim == 0 || self.hidden_size == 0 || self.word_hidden == 0 {
            return Err(CaptionError::config(
                "embedding_dim, hidden_size and word_hidden must be at least 1",
            ));
        }
        if self.backbone_width == 0 {
            return Err(CaptionError::config("backbone_width must be at least 1"));
        }
        if self.kind.uses_word_indices() && self.dictionary_size < 2 {
            return Err(CaptionError::config(format!(
                "the {} model needs a dictionary of at least 2 words, got {}",
                self.kind, self.dictionary_size
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(CaptionError::config(format!(
                "dropout must be in [0, 1), got {}", self.dropout
            )));
        }
        if !self.regularizer.is_finite() || self.regularizer < 0.0 {
            return Err(CaptionError::config(format!(
                "regularizer must be a non-negative number, got {}", self.regularizer
            )));
        }
        Ok(())
    }

    pub fn image_config(&self) -> ImageEmbedderConfig {
        let [height, width, channels] = self.image_shape;
        ImageEmbedderConfig::new(self.backbone, height, width)
            .with_channels(channels)
            .with_base_width(self.backbone_width)
    }

    /// F — declared length of one image feature vector.
    pub fn feature_len(&self) -> usize {
        self.image_config().output_len()
    }

    pub fn cell_config(&self) -> LstmCellConfig {
        LstmCellConfig::new(self.embedding_dim + self.feature_len(), self.hidden_size)
            .with_dropout(self.dropout)
    }

    /// Image encoder and recurrent cell, common to every kind.
    pub fn init_encoder<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<(ImageEmbedder<B>, LstmCell<B>), CaptionError> {
        self.validate()?;
        let image = self.image_config().init(device);
        let rnn   = self.cell_config().init(device);
        Ok((image, rnn))
    }
}

// ─── CaptionNet ───────────────────────────────────────────────────────────────
/// What the trainer, the assembler and the inferencer need from a model.
pub trait CaptionNet<B: Backend>: Module<B> + Sized {
    /// Which `ModelKind` this type implements.
    fn kind() -> ModelKind;

    /// Build the model; fails fast on inconsistent dimensions.
    fn init(config: &CaptionModelConfig, device: &B::Device) -> Result<Self, CaptionError>;

    /// Load pretrained backbone weights and freeze the backbone.
    fn with_backbone_weights(self, path: &Path, device: &B::Device) -> Result<Self, CaptionError>;

    /// images: [batch, C, H, W] → raw decoder outputs [batch, T, out],
    /// the tensor the loss is computed on.
    /// `truth` is required in `Mode::Training`.
    fn forward(
        &self,
        images: Tensor<B, 4>,
        truth:  Option<GroundTruth<B>>,
        mode:   Mode,
    ) -> Result<Tensor<B, 3>, CaptionError>;

    /// What a caller reads as the prediction of each step.
    fn predict(
        &self,
        images: Tensor<B, 4>,
        truth:  Option<GroundTruth<B>>,
        mode:   Mode,
    ) -> Result<Tensor<B, 3>, CaptionError> {
        self.forward(images, truth, mode)
    }
}

/// Images in NCHW for a model built from `config`.
pub fn image_dims(config: &CaptionModelConfig) -> [usize; 3] {
    let [h, w, c] = config.image_shape;
    [c, h, w]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ModelKind) -> CaptionModelConfig {
        CaptionModelConfig::new(kind, Backbone::ResNet50, [224, 224, 3], 50, 15, 400)
    }

    #[test]
    fn test_defaults_match_reference_architecture() {
        let cfg = config(ModelKind::ImageLoop);
        assert_eq!(cfg.hidden_size, 150);
        assert_eq!(cfg.word_hidden, 100);
        assert_eq!(cfg.feature_len(), 2048);
        assert_eq!(cfg.cell_config().d_input, 50 + 2048);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_caption_length_is_rejected() {
        let mut cfg = config(ModelKind::ImageLoop);
        cfg.max_caption_length = 0;
        assert!(matches!(cfg.validate(), Err(CaptionError::Configuration(_))));
    }

    #[test]
    fn test_indexed_kinds_need_a_dictionary() {
        let mut cfg = config(ModelKind::Softmax);
        cfg.dictionary_size = 1;
        assert!(cfg.validate().is_err());
        cfg.kind = ModelKind::Raw;
        assert!(cfg.validate().is_err());
        // The dense kinds do not read the dictionary size
        let mut cfg = config(ModelKind::Full);
        cfg.dictionary_size = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_dropout_range() {
        assert!(config(ModelKind::Full).with_dropout(1.0).validate().is_err());
        assert!(config(ModelKind::Full).with_dropout(0.0).validate().is_ok());
    }

    #[test]
    fn test_image_dims_are_channel_first() {
        let mut cfg = config(ModelKind::Full);
        cfg.image_shape = [120, 160, 3];
        assert_eq!(image_dims(&cfg), [3, 120, 160]);
    }
}
