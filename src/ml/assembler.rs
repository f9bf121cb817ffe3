// ============================================================
// Layer 5 — Model Assembler
// ============================================================
// Turns a model configuration into a trainable unit:
//
//   model      — initialised CaptionNet (backbone optionally pretrained)
//   optimizer  — Adam with L2 weight decay = regularizer
//   lr         — learning rate used at every optimiser step
//   loss       — MSE for word-vector outputs, CE for softmax outputs
//
// Data-parallel replication over several devices is not
// available for this model family. Asking for it is an error.
//
// Reference: Burn Book §5 (Training)
//            Kingma & Ba (2015) Adam

use burn::{
    optim::{decay::WeightDecayConfig, AdamConfig},
    prelude::*,
};
use std::path::PathBuf;

use crate::domain::error::CaptionError;
use crate::ml::{
    loss::LossKind,
    model::{CaptionModelConfig, CaptionNet},
};

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub learning_rate: f64,
    /// Number of compute devices to replicate over (0 or 1 = single device)
    pub devices:       usize,
    /// Recorded backbone weights to start from
    pub pretrained:    Option<PathBuf>,
}

pub struct TrainableUnit<M> {
    pub model:         M,
    pub optimizer:     AdamConfig,
    pub learning_rate: f64,
    pub loss:          LossKind,
}

pub fn assemble<B, M>(
    config:  &CaptionModelConfig,
    options: &AssemblyOptions,
    device:  &B::Device,
) -> Result<TrainableUnit<M>, CaptionError>
where
    B: Backend,
    M: CaptionNet<B>,
{
    if options.devices > 1 {
        return Err(CaptionError::Unsupported(format!(
            "the {} model cannot be replicated across {} devices; use a single device",
            config.kind, options.devices
        )));
    }
    if config.kind != M::kind() {
        return Err(CaptionError::config(format!(
            "configuration is for a {} model but a {} model was requested",
            config.kind,
            M::kind()
        )));
    }
    if !(options.learning_rate.is_finite() && options.learning_rate > 0.0) {
        return Err(CaptionError::config(format!(
            "learning rate must be positive, got {}", options.learning_rate
        )));
    }

    let model = M::init(config, device)?;
    let model = match &options.pretrained {
        Some(path) => model.with_backbone_weights(path, device)?,
        None       => model,
    };

    let optimizer = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(Some(WeightDecayConfig::new(config.regularizer as f32)));

    tracing::info!(
        "Assembled {} model: backbone={}, params={}, T={}, E={}, lr={}",
        config.kind,
        config.backbone,
        model.num_params(),
        config.max_caption_length,
        config.embedding_dim,
        options.learning_rate,
    );

    Ok(TrainableUnit {
        model,
        optimizer,
        learning_rate: options.learning_rate,
        loss:          LossKind::for_model(config.kind),
    })
}
