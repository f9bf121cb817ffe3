// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop shared by every model kind, using Burn's
// DataLoader and the Adam unit built by the assembler.
//
//   - Training runs on any AutodiffBackend (Autodiff<Wgpu> from
//     the CLI) and decodes in Mode::Training (teacher forcing)
//   - model.valid() returns the model on the inner backend with
//     dropout disabled; validation batches must use the inner
//     backend too
//   - Every batch loss goes through the LossKind the assembler
//     picked for the model
//   - Validation is measured twice per epoch: teacher-forced,
//     and free-running (Mode::Inference), which is the
//     condition the model meets when captioning new images
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{CaptionBatch, CaptionBatcher},
    dataset::CaptionDataset,
    embeddings::WordVectors,
};
use crate::domain::{mode::Mode, variants::ModelKind};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    assembler::assemble,
    full::FullModel,
    image_loop::ImageLoopModel,
    loss::LossKind,
    model::{image_dims, CaptionNet},
    raw::RawModel,
    softmax::SoftmaxModel,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub struct TrainingRun<'a> {
    pub config:  &'a TrainConfig,
    pub train:   CaptionDataset,
    pub val:     CaptionDataset,
    pub vectors: Arc<WordVectors>,
    pub ckpt:    &'a CheckpointManager,
    pub metrics: &'a MetricsLogger,
}

pub fn run_training(run: TrainingRun<'_>) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    MyBackend::seed(run.config.seed);

    match run.config.model_kind {
        ModelKind::Full      => train_loop::<MyBackend, FullModel<MyBackend>>(run, device).map(drop),
        ModelKind::ImageLoop => train_loop::<MyBackend, ImageLoopModel<MyBackend>>(run, device).map(drop),
        ModelKind::Raw       => train_loop::<MyBackend, RawModel<MyBackend>>(run, device).map(drop),
        ModelKind::Softmax   => train_loop::<MyBackend, SoftmaxModel<MyBackend>>(run, device).map(drop),
    }
}

/// Train for `config.epochs` epochs and return the final model.
pub fn train_loop<B, M>(run: TrainingRun<'_>, device: B::Device) -> Result<M>
where
    B: AutodiffBackend,
    M: CaptionNet<B> + AutodiffModule<B>,
    M::InnerModule: CaptionNet<B::InnerBackend>,
{
    let cfg       = run.config;
    let model_cfg = cfg.model_config();

    // ── Build model and optimiser ─────────────────────────────────────────────
    let unit      = assemble::<B, M>(&model_cfg, &cfg.assembly_options(), &device)?;
    let loss_kind = unit.loss;
    let mut model = unit.model;
    let mut optim = unit.optimizer.init::<B, M>();
    tracing::info!("Loss: {:?}", loss_kind);

    let dims    = image_dims(&model_cfg);
    let has_val = !run.val.is_empty();
    if !has_val {
        tracing::warn!("Validation split is empty; no epoch will be marked as best");
    }

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = CaptionBatcher::<B>::new(device.clone(), run.vectors.clone(), dims);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.workers)
        .build(run.train);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_batcher = CaptionBatcher::<B::InnerBackend>::new(device.clone(), run.vectors, dims);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(cfg.workers)
        .build(run.val);

    let mut best = f64::NAN;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (updated, loss) = train_step(model, &mut optim, batch, loss_kind, unit.learning_rate)?;
            model = updated;

            train_loss_sum += loss;
            train_batches  += 1;
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut forced_sum  = 0.0f64;
        let mut free_sum    = 0.0f64;
        let mut val_batches = 0usize;

        for batch in val_loader.iter() {
            let forced = loss_kind.batch_loss(&model_valid, batch.clone(), Mode::Training)?;
            let free   = loss_kind.batch_loss(&model_valid, batch, Mode::Inference)?;

            forced_sum  += forced.into_scalar().elem::<f64>();
            free_sum    += free.into_scalar().elem::<f64>();
            val_batches += 1;
        }

        let metrics = EpochMetrics::new(
            epoch,
            mean(train_loss_sum, train_batches),
            mean(forced_sum, val_batches),
            mean(free_sum, val_batches),
        );

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | free_running={:.4}",
            epoch, cfg.epochs, metrics.train_loss, metrics.val_loss, metrics.val_free_running_loss,
        );

        if has_val && metrics.is_improvement(best) {
            best = metrics.val_free_running_loss;
            tracing::info!("Epoch {} is the best so far ({:.4})", epoch, best);
        }

        run.metrics.log(&metrics)?;
        run.ckpt.save_model::<B, M>(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(model)
}

/// One teacher-forced optimiser step. Returns the updated model
/// and the loss of the batch before the update.
fn train_step<B, M, O>(
    model:     M,
    optim:     &mut O,
    batch:     CaptionBatch<B>,
    loss_kind: LossKind,
    lr:        f64,
) -> Result<(M, f64)>
where
    B: AutodiffBackend,
    M: CaptionNet<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let loss  = loss_kind.batch_loss(&model, batch, Mode::Training)?;
    let value = loss.clone().into_scalar().elem::<f64>();

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    Ok((optim.step(lr, model, grads), value))
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}
