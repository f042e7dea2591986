// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a scoring run needs to rebuild
// the exact model that was trained:
//
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1 (CompactRecorder)
//     ...
//     latest_epoch.json      ← epoch of the newest weights
//     best_epoch.json        ← epoch with the lowest dev loss
//     train_config.json      ← TrainConfig (pipeline + model)
//     graph_vocab.txt        ← relation labels, one per line
//     tokenizer.json         ← written by TokenizerStore
//
// Loading fails if the model architecture does not match the
// saved record.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::vocab::GraphVocab;
use crate::ml::model::ParserModel;

pub const VOCAB_FILE: &str = "graph_vocab.txt";

/// Which saved epoch to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointChoice {
    Latest,
    Best,
    Epoch(usize),
}

impl std::str::FromStr for CheckpointChoice {
    type Err = String;

    /// `latest`, `best`, or an epoch number.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "best"   => Ok(Self::Best),
            other    => other
                .parse::<usize>()
                .map(Self::Epoch)
                .map_err(|_| format!("expected 'latest', 'best' or an epoch number, got '{s}'")),
        }
    }
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save model weights for a given epoch and move the latest
    /// pointer to it.
    pub fn save_model<B: Backend>(
        &self,
        model: &ParserModel<B>,
        epoch: usize,
    ) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        self.write_pointer("latest_epoch.json", epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Record `epoch` as the best one so far.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_pointer("best_epoch.json", epoch)
    }

    /// Restore weights into a freshly initialised `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:  ParserModel<B>,
        choice: CheckpointChoice,
        device: &B::Device,
    ) -> Result<ParserModel<B>> {
        let epoch = match choice {
            CheckpointChoice::Latest   => self.read_pointer("latest_epoch.json")?,
            CheckpointChoice::Best     => self
                .read_pointer("best_epoch.json")
                .or_else(|_| self.read_pointer("latest_epoch.json"))?,
            CheckpointChoice::Epoch(n) => n,
        };
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
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
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'score'.",
                    path.display()
                )
            })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed training config '{}'", path.display()))
    }

    /// Keep the label set with the weights; the labeled scorer's
    /// output dimension depends on it.
    pub fn save_vocab(&self, vocab: &GraphVocab) -> Result<()> {
        let path = self.dir.join(VOCAB_FILE);
        fs::write(&path, vocab.to_file_contents())
            .with_context(|| format!("Cannot write graph vocabulary to '{}'", path.display()))
    }

    pub fn load_vocab(&self) -> Result<GraphVocab> {
        load_graph_vocab(&self.dir.join(VOCAB_FILE))
    }

    fn write_pointer(&self, name: &str, epoch: usize) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {name}"))
    }

    fn read_pointer(&self, name: &str) -> Result<usize> {
        let path = self.dir.join(name);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{name}'. Have you run 'train' first?"))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

/// Read a graph vocabulary file (one relation label per line).
pub fn load_graph_vocab(path: &std::path::Path) -> Result<GraphVocab> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Cannot read graph vocabulary '{}'", path.display()))?;
    let vocab = GraphVocab::parse(&contents)
        .with_context(|| format!("Invalid graph vocabulary '{}'", path.display()))?;
    tracing::debug!("Loaded {} relation labels from '{}'", vocab.len() - 1, path.display());
    Ok(vocab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::TokenEncoderConfig;
    use crate::ml::model::DependencyModelConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model_config() -> DependencyModelConfig {
        DependencyModelConfig::new(TokenEncoderConfig::new(12, 8, 8, 2, 1, 16), 3)
            .with_biaffine_hidden_dim(4)
    }

    #[test]
    fn test_parse_checkpoint_choice() {
        assert_eq!("best".parse::<CheckpointChoice>().unwrap(), CheckpointChoice::Best);
        assert_eq!("Latest".parse::<CheckpointChoice>().unwrap(), CheckpointChoice::Latest);
        assert_eq!("3".parse::<CheckpointChoice>().unwrap(), CheckpointChoice::Epoch(3));
        assert!("last".parse::<CheckpointChoice>().is_err());
    }

    #[test]
    fn test_model_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().to_string_lossy().to_string()).unwrap();
        let device = Default::default();
        let model  = model_config().init::<TestBackend>(&device);
        ckpt.save_model(&model, 1).unwrap();
        ckpt.save_model(&model, 2).unwrap();
        ckpt.mark_best(1).unwrap();

        let fresh = model_config().init::<TestBackend>(&device);
        assert!(ckpt.load_model(fresh, CheckpointChoice::Best, &device).is_ok());
        let fresh = model_config().init::<TestBackend>(&device);
        assert!(ckpt.load_model(fresh, CheckpointChoice::Epoch(7), &device).is_err());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().to_string_lossy().to_string()).unwrap();
        let device = Default::default();
        let fresh  = model_config().init::<TestBackend>(&device);
        assert!(ckpt.load_model(fresh, CheckpointChoice::Latest, &device).is_err());
    }

    #[test]
    fn test_vocab_and_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy().to_string()).unwrap();
        let vocab = GraphVocab::from_labels(["Agt", "Pat"]).unwrap();
        ckpt.save_vocab(&vocab).unwrap();
        assert_eq!(ckpt.load_vocab().unwrap(), vocab);

        let cfg = TrainConfig::default();
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap().epochs, cfg.epochs);
    }
}
