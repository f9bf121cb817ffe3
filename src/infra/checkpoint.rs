// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores caption model weights using Burn's
// CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) after every epoch
//   2. latest_epoch.json   — which epoch was last saved
//   3. train_config.json   — everything needed to rebuild the
//                            architecture (kind, backbone, T, E, ...)
//
// The config is written before the first epoch, so a run that
// is interrupted still leaves a loadable checkpoint directory.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json
//     train_config.json
//     metrics.csv
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record `model` as `model_epoch_{epoch}` and point
    /// latest_epoch.json at it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest checkpoint into a model of the same architecture.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'caption'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed training config '{}'", path.display()))
    }

    /// Epoch number stored in latest_epoch.json.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{mode::Mode, variants::ModelKind};
    use crate::ml::{image_loop::ImageLoopModel, model::CaptionNet, testing};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cacao-ckpt-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = scratch("config");
        let ckpt = CheckpointManager::new(&dir).unwrap();

        let mut cfg = TrainConfig::default();
        cfg.max_caption_length = 7;
        cfg.model_kind         = ModelKind::Softmax;
        ckpt.save_config(&cfg).unwrap();

        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.max_caption_length, 7);
        assert_eq!(loaded.model_kind, ModelKind::Softmax);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_checkpoint_is_reported() {
        let dir  = scratch("empty");
        let ckpt = CheckpointManager::new(&dir).unwrap();
        assert!(ckpt.latest_epoch().is_err());
        assert!(ckpt.load_config().is_err());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_weights_round_trip() {
        let dir    = scratch("weights");
        let ckpt   = CheckpointManager::new(&dir).unwrap();
        let device = Default::default();
        let cfg    = testing::tiny_config(ModelKind::ImageLoop);

        let trained = ImageLoopModel::<TestBackend>::init(&cfg, &device).unwrap();
        ckpt.save_model::<TestBackend, _>(&trained, 3).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), 3);

        let fresh  = ImageLoopModel::<TestBackend>::init(&cfg, &device).unwrap();
        let loaded = ckpt.load_model::<TestBackend, _>(fresh, &device).unwrap();

        let batch = testing::tiny_batch::<TestBackend>(&cfg, 1, &device);
        let a = trained.predict(batch.images.clone(), None, Mode::Inference).unwrap();
        let b = loaded.predict(batch.images, None, Mode::Inference).unwrap();
        a.into_data().assert_approx_eq(&b.into_data(), 5);

        fs::remove_dir_all(dir).ok();
    }
}
