// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch:
//
//   epoch,train_loss,dev_loss,arc_loss,label_loss,label_loss_ratio
//   1,0.412300,0.398100,0.201200,1.204400,0.500000
//
// dev_loss, arc_loss and label_loss are dev-split averages; they
// are NaN when no dev split is available.
//
// Output file: <checkpoint_dir>/metrics.csv

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch:            usize,
    pub train_loss:       f64,
    pub dev_loss:         f64,
    /// Unlabeled (arc) part of the dev loss
    pub arc_loss:         f64,
    /// Labeled (relation) part of the dev loss
    pub label_loss:       f64,
    pub label_loss_ratio: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64) -> Self {
        Self {
            epoch,
            train_loss,
            dev_loss:         f64::NAN,
            arc_loss:         f64::NAN,
            label_loss:       f64::NAN,
            label_loss_ratio: f64::NAN,
        }
    }

    /// True if this epoch beat the best dev loss so far.
    /// An epoch without a dev loss never counts as an improvement.
    pub fn is_improvement(&self, best_dev_loss: f64) -> bool {
        !self.dev_loss.is_nan() && (best_dev_loss.is_nan() || self.dev_loss < best_dev_loss)
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,dev_loss,arc_loss,label_loss,label_loss_ratio")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.dev_loss,
            m.arc_loss,
            m.label_loss,
            m.label_loss_ratio,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, dev_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.dev_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let mut m = EpochMetrics::new(2, 2.5);
        m.dev_loss = 2.3;
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(m.is_improvement(f64::NAN));
    }

    #[test]
    fn test_missing_dev_loss_is_never_an_improvement() {
        let m = EpochMetrics::new(1, 0.7);
        assert!(!m.is_improvement(f64::NAN));
        assert!(!m.is_improvement(10.0));
    }

    #[test]
    fn test_rows_are_appended() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().to_string_lossy().to_string()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.4)).unwrap();

        let contents = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,train_loss,dev_loss"));
        assert!(lines[2].starts_with("2,0.400000,NaN"));
    }
}
