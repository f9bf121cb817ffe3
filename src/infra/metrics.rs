// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:                  the epoch number (1, 2, 3, ...)
//   - train_loss:             mean loss over training batches
//   - val_loss:               validation loss, teacher-forced
//   - val_free_running_loss:  validation loss, decoder fed its
//                             own predictions (what inference sees)
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,val_free_running_loss
//   1,0.412300,0.398100,0.455200
//   2,0.301700,0.310400,0.389900
//
// A growing gap between val_loss and val_free_running_loss means
// the decoder leans on ground truth it will not have at inference.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,val_loss,val_free_running_loss";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:                 usize,
    pub train_loss:            f64,
    pub val_loss:              f64,
    pub val_free_running_loss: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_free_running_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss, val_free_running_loss }
    }

    /// True if this epoch's free-running validation loss beats `best`.
    /// An epoch without validation batches (NaN loss) never does.
    pub fn is_improvement(&self, best: f64) -> bool {
        !self.val_free_running_loss.is_nan()
            && (best.is_nan() || self.val_free_running_loss < best)
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.val_free_running_loss,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 2.6);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(m.is_improvement(f64::NAN));
    }

    #[test]
    fn test_epoch_without_validation_is_never_best() {
        let m = EpochMetrics::new(1, 0.5, f64::NAN, f64::NAN);
        assert!(!m.is_improvement(f64::NAN));
        assert!(!m.is_improvement(1.0));
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir = std::env::temp_dir().join(format!("cacao-metrics-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.4, 0.6)).unwrap();
        // A second logger on the same directory keeps the file
        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&EpochMetrics::new(2, 0.3, 0.2, 0.35)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "1,0.500000,0.400000,0.600000");
        assert_eq!(lines.len(), 3);

        fs::remove_dir_all(dir).ok();
    }
}
