// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read the caption manifest     (Layer 4 - data)
//   Step 2: Load word vectors             (Layer 4 - data)
//   Step 3: Decode images, encode words   (Layer 4 - data)
//   Step 4: Split train/validation        (Layer 4 - data)
//   Step 5: Build datasets                (Layer 4 - data)
//   Step 6: Save config                   (Layer 6 - infra)
//   Step 7: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    dataset::{build_samples, CaptionDataset},
    embeddings::WordVectors,
    manifest::JsonManifest,
    preprocessor::{CaptionTokenizer, ImagePreprocessor},
    splitter::split_train_val,
};
use crate::domain::{
    traits::CaptionSource,
    variants::{Backbone, ModelKind},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    assembler::AssemblyOptions,
    model::CaptionModelConfig,
    trainer::{run_training, TrainingRun},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved next to the checkpoints so `caption` can rebuild the
// exact architecture and reload the same word vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub manifest:           String,
    pub embeddings:         String,
    pub checkpoint_dir:     String,
    pub model_kind:         ModelKind,
    pub backbone:           Backbone,
    pub backbone_width:     usize,
    pub image_height:       usize,
    pub image_width:        usize,
    pub image_channels:     usize,
    pub embedding_dim:      usize,
    pub max_caption_length: usize,
    pub dictionary_size:    usize,
    pub hidden_size:        usize,
    pub word_hidden:        usize,
    pub batch_size:         usize,
    pub epochs:             usize,
    pub lr:                 f64,
    pub dropout:            f64,
    pub regularizer:        f64,
    pub devices:            usize,
    pub workers:            usize,
    pub seed:               u64,
    pub val_fraction:       f64,
    /// Recorded backbone weights to start from
    pub weights:            Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            manifest:           "data/captions.json".to_string(),
            embeddings:         "data/glove.6B.50d.txt".to_string(),
            checkpoint_dir:     "checkpoints".to_string(),
            model_kind:         ModelKind::ImageLoop,
            backbone:           Backbone::ResNet50,
            backbone_width:     64,
            image_height:       224,
            image_width:        224,
            image_channels:     3,
            embedding_dim:      50,
            max_caption_length: 15,
            dictionary_size:    10_000,
            hidden_size:        150,
            word_hidden:        100,
            batch_size:         32,
            epochs:             50,
            lr:                 1e-3,
            dropout:            0.2,
            regularizer:        1e-8,
            devices:            1,
            workers:            8,
            seed:               42,
            val_fraction:       0.1,
            weights:            None,
        }
    }
}

impl TrainConfig {
    pub fn image_shape(&self) -> [usize; 3] {
        [self.image_height, self.image_width, self.image_channels]
    }

    pub fn model_config(&self) -> CaptionModelConfig {
        CaptionModelConfig::new(
            self.model_kind,
            self.backbone,
            self.image_shape(),
            self.embedding_dim,
            self.max_caption_length,
            self.dictionary_size,
        )
        .with_backbone_width(self.backbone_width)
        .with_hidden_size(self.hidden_size)
        .with_word_hidden(self.word_hidden)
        .with_dropout(self.dropout)
        .with_regularizer(self.regularizer)
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            learning_rate: self.lr,
            devices:       self.devices,
            pretrained:    self.weights.as_ref().map(PathBuf::from),
        }
    }

    /// Word vectors as this run sees them: capped at the dictionary
    /// size and checked against the configured embedding width.
    pub fn load_vectors(&self) -> Result<WordVectors> {
        let vectors = WordVectors::load(self.embeddings.as_ref(), Some(self.dictionary_size))?;
        if vectors.dim() != self.embedding_dim {
            bail!(
                "word vectors in '{}' have dimension {}, but embedding_dim is {}",
                self.embeddings,
                vectors.dim(),
                self.embedding_dim
            );
        }
        Ok(vectors)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let mut cfg = self.config.clone();
        if cfg.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        // Fail on a bad architecture before touching any image
        cfg.model_config().validate()?;

        // ── Step 1: Read the caption manifest ─────────────────────────────────
        tracing::info!("Reading captions from '{}'", cfg.manifest);
        let records = JsonManifest::new(&cfg.manifest).load_all()?;
        if records.is_empty() {
            bail!("manifest '{}' contains no usable captions", cfg.manifest);
        }

        // ── Step 2: Load word vectors ─────────────────────────────────────────
        // The file may hold fewer words than asked for; the model is
        // sized to what was actually loaded.
        let vectors = cfg.load_vectors()?;
        cfg.dictionary_size = vectors.len();

        // ── Step 3: Decode images and encode captions ─────────────────────────
        let images    = ImagePreprocessor::new(cfg.image_shape())?;
        let tokenizer = CaptionTokenizer::new(&vectors, cfg.max_caption_length)?;
        let samples   = build_samples(&records, &images, &tokenizer);
        if samples.is_empty() {
            bail!("none of the {} manifest images could be decoded", records.len());
        }
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.val_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 5: Build Burn datasets ───────────────────────────────────────
        let train = CaptionDataset::new(train_samples);
        let val   = CaptionDataset::new(val_samples);

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(&cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)
            .context("Cannot open the metrics log")?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(TrainingRun {
            config:  &cfg,
            train,
            val,
            vectors: Arc::new(vectors),
            ckpt:    &ckpt,
            metrics: &metrics,
        })
    }
}
