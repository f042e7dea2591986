// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run:
//
//   Step 1: Load the graph vocabulary      (Layer 6 - infra)
//   Step 2: Read train / dev corpora       (Layer 4 - data)
//   Step 3: Load or build the tokenizer    (Layer 6 - infra)
//   Step 4: Build train / dev features     (Layer 4 - data)
//   Step 5: Save config + vocabulary       (Layer 6 - infra)
//   Step 6: Run the training loop          (Layer 5 - ml)

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    conllu::ConlluReader,
    context::{InputConfig, PipelineContext},
    dataset::DependencyDataset,
    features::build_indexed_features,
    splitter::hold_out_dev,
};
use crate::domain::sentence::RawSentence;
use crate::domain::traits::{SentenceSource, SubwordTokenizer};
use crate::infra::{
    checkpoint::{load_graph_vocab, CheckpointManager},
    metrics::MetricsLogger,
    tokenizer_store::{load_tokenizer, TokenizerStore},
};
use crate::ml::{
    biaffine::BiaffineVariant,
    encoder::{EncoderOutput, TokenEncoderConfig},
    model::{DependencyModelConfig, LossRatio},
    pooling::WordPooling,
    trainer::run_training,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved next to the checkpoints so scoring rebuilds the same
// pipeline and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_file:          String,
    /// Without a dev corpus, `dev_fraction` of train is held out
    pub dev_file:            Option<String>,
    pub dev_fraction:        f64,
    pub vocab_file:          String,
    /// Existing tokenizer.json; built from the corpus when absent
    pub tokenizer_file:      Option<String>,
    pub max_vocab:           usize,
    pub checkpoint_dir:      String,
    pub input:               InputConfig,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub seed:                u64,
    /// Stop after this many epochs without a dev improvement
    pub early_stop_epochs:   Option<usize>,
    pub d_model:             usize,
    pub num_heads:           usize,
    pub num_layers:          usize,
    pub d_ff:                usize,
    pub dropout:             f64,
    pub encoder_output:      EncoderOutput,
    pub pooling:             WordPooling,
    pub biaffine_variant:    BiaffineVariant,
    pub biaffine_hidden_dim: usize,
    pub biaffine_dropout:    f64,
    pub loss_ratio:          LossRatio,
    /// Filled in once the tokenizer is known
    pub vocab_size:          usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:          "data/train.conllu".to_string(),
            dev_file:            None,
            dev_fraction:        0.1,
            vocab_file:          "data/graph_vocab.txt".to_string(),
            tokenizer_file:      None,
            max_vocab:           30000,
            checkpoint_dir:      "checkpoints".to_string(),
            input:               InputConfig::default(),
            batch_size:          16,
            epochs:              10,
            lr:                  5e-5,
            seed:                42,
            early_stop_epochs:   None,
            d_model:             256,
            num_heads:           8,
            num_layers:          4,
            d_ff:                1024,
            dropout:             0.1,
            encoder_output:      EncoderOutput::Last,
            pooling:             WordPooling::Sum,
            biaffine_variant:    BiaffineVariant::Deep,
            biaffine_hidden_dim: 300,
            biaffine_dropout:    0.1,
            loss_ratio:          LossRatio::default(),
            vocab_size:          0,
        }
    }
}

impl TrainConfig {
    /// Model hyper-parameters for `num_labels` relation ids
    /// (reserved entry included).
    pub fn model_config(&self, num_labels: usize) -> DependencyModelConfig {
        let encoder = TokenEncoderConfig::new(
            self.vocab_size, self.input.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_dropout(self.dropout)
        .with_output(self.encoder_output);

        DependencyModelConfig::new(encoder, num_labels)
            .with_biaffine_variant(self.biaffine_variant)
            .with_biaffine_hidden_dim(self.biaffine_hidden_dim)
            .with_biaffine_dropout(self.biaffine_dropout)
            .with_pooling(self.pooling)
            .with_loss_ratio(self.loss_ratio)
    }

    pub fn validate(&self) -> Result<()> {
        self.input.validate()?;
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.epochs > 0, "epochs must be positive");
        anyhow::ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.dev_fraction),
            "dev_fraction must lie in [0, 1)"
        );
        Ok(())
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
        cfg.validate()?;

        // ── Step 1: Graph vocabulary ──────────────────────────────────────────
        let vocab = Arc::new(load_graph_vocab(Path::new(&cfg.vocab_file))?);
        tracing::info!("Graph vocabulary: {} relation ids", vocab.len());

        // ── Step 2: Corpora ───────────────────────────────────────────────────
        let train_raw = ConlluReader::new(&cfg.train_file)
            .sentences()
            .with_context(|| format!("Cannot read training corpus '{}'", cfg.train_file))?;
        let dev_raw = match &cfg.dev_file {
            Some(dev_file) => Some(
                ConlluReader::new(dev_file)
                    .sentences()
                    .with_context(|| format!("Cannot read dev corpus '{dev_file}'"))?,
            ),
            None => None,
        };
        let corpora = split_corpora(train_raw, dev_raw, cfg.dev_fraction, cfg.seed);
        let (train_raw, dev_raw) = (&corpora.train, &corpora.dev);
        tracing::info!("Corpora: {} train, {} dev sentences", train_raw.len(), dev_raw.len());

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let tokenizer = match &cfg.tokenizer_file {
            Some(path) => {
                let tokenizer = load_tokenizer(Path::new(path))?;
                tok_store.save(&tokenizer)?;
                tokenizer
            }
            None => tok_store.load_or_build(
                train_raw.iter().chain(dev_raw.iter()).flat_map(|(_, s)| s.words()),
                cfg.max_vocab,
            )?,
        };
        cfg.vocab_size = SubwordTokenizer::vocab_size(&tokenizer);
        let tokenizer: Arc<dyn SubwordTokenizer> = Arc::new(tokenizer);

        // ── Step 4: Features ──────────────────────────────────────────────────
        let ctx = PipelineContext::new(cfg.input.clone(), vocab.clone(), tokenizer)?;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (train_features, _) = build_indexed_features(
            train_raw.iter().map(|(i, s)| (*i, s)), &ctx, "train", true, &mut rng,
        )?;
        let (dev_features, _) = build_indexed_features(
            dev_raw.iter().map(|(i, s)| (*i, s)), &ctx, corpora.dev_split, false, &mut rng,
        )?;
        anyhow::ensure!(!train_features.is_empty(), "no training sentence fits max_seq_len");

        let train_dataset = DependencyDataset::new(train_features);
        let dev_dataset   = (!dev_features.is_empty()).then(|| DependencyDataset::new(dev_features));

        // ── Step 5: Persist what scoring needs ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&cfg)?;
        ckpt_manager.save_vocab(&vocab)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let model_cfg = cfg.model_config(vocab.len());
        model_cfg.validate()?;
        run_training(&cfg, &model_cfg, train_dataset, dev_dataset, ckpt_manager, metrics)?;

        Ok(())
    }
}

// ─── Corpus Split ────────────────────────────────────────────────────────────
/// Train and dev sentences, each paired with its index in the
/// corpus it was read from.
struct Corpora {
    train:     Vec<(usize, RawSentence)>,
    dev:       Vec<(usize, RawSentence)>,
    /// Id prefix of the dev features
    dev_split: &'static str,
}

/// Held-out dev sentences keep their training-corpus index and
/// the `train` prefix, so their ids point back at the source line.
fn split_corpora(
    train:        Vec<RawSentence>,
    dev:          Option<Vec<RawSentence>>,
    dev_fraction: f64,
    seed:         u64,
) -> Corpora {
    let train: Vec<(usize, RawSentence)> = train.into_iter().enumerate().collect();
    match dev {
        Some(dev) => Corpora {
            train,
            dev:       dev.into_iter().enumerate().collect(),
            dev_split: "dev",
        },
        None => {
            let (mut train, mut dev) = hold_out_dev(train, dev_fraction, seed);
            train.sort_by_key(|(i, _)| *i);
            dev.sort_by_key(|(i, _)| *i);
            Corpora { train, dev, dev_split: "train" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_heads_must_divide_width() {
        let cfg = TrainConfig { d_model: 100, num_heads: 8, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_model_config_follows_train_config() {
        let cfg = TrainConfig {
            vocab_size:       500,
            biaffine_variant: BiaffineVariant::Direct,
            loss_ratio:       LossRatio::Learned,
            ..TrainConfig::default()
        };
        let model_cfg = cfg.model_config(12);
        assert_eq!(model_cfg.num_labels, 12);
        assert_eq!(model_cfg.encoder.vocab_size, 500);
        assert_eq!(model_cfg.encoder.max_seq_len, cfg.input.max_seq_len);
        assert_eq!(model_cfg.biaffine_variant, BiaffineVariant::Direct);
        assert_eq!(model_cfg.loss_ratio, LossRatio::Learned);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig { dev_file: Some("dev.conllu".into()), ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dev_file.as_deref(), Some("dev.conllu"));
        assert_eq!(back.input, cfg.input);
    }

    fn corpus(n: usize) -> Vec<RawSentence> {
        use crate::domain::sentence::RawRow;
        (0..n)
            .map(|i| RawSentence::new(vec![RawRow::new(format!("w{i}"), "0:root")]))
            .collect()
    }

    #[test]
    fn test_held_out_dev_keeps_corpus_indices() {
        let original = corpus(20);
        let corpora  = split_corpora(original.clone(), None, 0.25, 7);
        assert_eq!(corpora.train.len(), 15);
        assert_eq!(corpora.dev.len(), 5);
        assert_eq!(corpora.dev_split, "train");
        for (index, sentence) in corpora.train.iter().chain(&corpora.dev) {
            assert_eq!(sentence, &original[*index]);
        }
        assert!(corpora.dev.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_explicit_dev_corpus_is_numbered_on_its_own() {
        let corpora = split_corpora(corpus(4), Some(corpus(3)), 0.25, 7);
        assert_eq!(corpora.train.len(), 4);
        let dev_ids: Vec<usize> = corpora.dev.iter().map(|(i, _)| *i).collect();
        assert_eq!(dev_ids, [0, 1, 2]);
        assert_eq!(corpora.dev_split, "dev");
    }
}
