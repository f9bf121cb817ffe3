// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `caption` and `normalize`.
//
// Backbone, model kind and normalisation method are parsed
// through their FromStr impls, so a typo is rejected by clap
// with the list of accepted names.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::embeddings::Normalization;
use crate::domain::variants::{Backbone, ModelKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a caption model on a JSON manifest of images
    Train(TrainArgs),

    /// Caption images with a trained checkpoint
    Caption(CaptionArgs),

    /// Rescale a GloVe word-vector file
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON list of {"image": ..., "caption": ...} records
    #[arg(long, default_value = "data/captions.json")]
    pub manifest: String,

    /// GloVe-format word vectors (one word and E values per line)
    #[arg(long, default_value = "data/glove.6B.50d.txt")]
    pub embeddings: String,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// full | image-loop | raw | softmax
    #[arg(long, default_value = "image-loop")]
    pub model: ModelKind,

    /// resnet50 | resnet152
    #[arg(long, default_value = "resnet50")]
    pub cnn: Backbone,

    /// Channel width of the first backbone stage
    #[arg(long, default_value_t = 64)]
    pub backbone_width: usize,

    /// Recorded backbone weights to start from (frozen during training)
    #[arg(long)]
    pub weights: Option<String>,

    #[arg(long, default_value_t = 224)]
    pub image_height: usize,

    #[arg(long, default_value_t = 224)]
    pub image_width: usize,

    /// 3 for RGB, 1 for greyscale
    #[arg(long, default_value_t = 3)]
    pub image_channels: usize,

    /// Width of one word vector; must match the embeddings file
    #[arg(long, default_value_t = 50)]
    pub embedding_dim: usize,

    /// Number of decoding steps (words per caption)
    #[arg(long, default_value_t = 15)]
    pub max_caption_length: usize,

    /// Words kept from the embeddings file, padding entry included
    #[arg(long, default_value_t = 10_000)]
    pub dictionary_size: usize,

    /// LSTM width
    #[arg(long, default_value_t = 150)]
    pub hidden_size: usize,

    /// Hidden width of the word embedder
    #[arg(long, default_value_t = 100)]
    pub word_hidden: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// L2 weight decay
    #[arg(long, default_value_t = 1e-8)]
    pub regularizer: f64,

    /// Requested compute devices; only the first one is used
    #[arg(long, default_value_t = 1)]
    pub devices: usize,

    /// Data loader worker threads
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of samples held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            manifest:           a.manifest,
            embeddings:         a.embeddings,
            checkpoint_dir:     a.checkpoint_dir,
            model_kind:         a.model,
            backbone:           a.cnn,
            backbone_width:     a.backbone_width,
            image_height:       a.image_height,
            image_width:        a.image_width,
            image_channels:     a.image_channels,
            embedding_dim:      a.embedding_dim,
            max_caption_length: a.max_caption_length,
            dictionary_size:    a.dictionary_size,
            hidden_size:        a.hidden_size,
            word_hidden:        a.word_hidden,
            batch_size:         a.batch_size,
            epochs:             a.epochs,
            lr:                 a.lr,
            dropout:            a.dropout,
            regularizer:        a.regularizer,
            devices:            a.devices,
            workers:            a.workers,
            seed:               a.seed,
            val_fraction:       a.val_fraction,
            weights:            a.weights,
        }
    }
}

#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Images to describe
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// GloVe file to read
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the rescaled vectors
    #[arg(long)]
    pub output: PathBuf,

    /// minmax | studentz
    #[arg(long, default_value = "minmax")]
    pub method: Normalization,
}
