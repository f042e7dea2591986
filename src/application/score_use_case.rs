// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Scores a corpus with a trained checkpoint:
//
//   Step 1: Load config, vocabulary, tokenizer  (Layer 6 - infra)
//   Step 2: Build features, no corruption       (Layer 4 - data)
//   Step 3: Load the model and score            (Layer 5 - ml)
//   Step 4: Write one JSON line per sentence
//
// Sentences skipped as too long have no line in the output.

use std::{
    fs::File,
    io::{BufWriter, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use burn::prelude::Backend;
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{
    conllu::ConlluReader,
    context::PipelineContext,
    dataset::DependencyDataset,
    features::build_features,
};
use crate::domain::traits::{SentenceSource, SubwordTokenizer};
use crate::infra::{
    checkpoint::{CheckpointChoice, CheckpointManager},
    tokenizer_store::TokenizerStore,
};
use crate::ml::scorer::Scorer;

type ScoreBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub corpus_file:    String,
    pub checkpoint_dir: String,
    pub checkpoint:     CheckpointChoice,
    pub output_file:    String,
    /// Prefix of the sentence ids in the output
    pub split:          String,
    pub batch_size:     usize,
}

pub struct ScoreUseCase {
    config: ScoreConfig,
}

impl ScoreUseCase {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    /// Returns the number of sentences written.
    pub fn execute(&self) -> Result<usize> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<ScoreBackend>(device)
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<usize> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.batch_size > 0, "batch_size must be positive");

        // ── Step 1: Everything saved by `train` ───────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let train_cfg    = ckpt_manager.load_config()?;
        let vocab        = Arc::new(ckpt_manager.load_vocab()?);
        let tokenizer: Arc<dyn SubwordTokenizer> =
            Arc::new(TokenizerStore::new(&cfg.checkpoint_dir).load()?);

        // ── Step 2: Features ──────────────────────────────────────────────────
        let ctx = PipelineContext::new(train_cfg.input.clone(), vocab, tokenizer)?;
        let sentences = ConlluReader::new(&cfg.corpus_file)
            .sentences()
            .with_context(|| format!("Cannot read corpus '{}'", cfg.corpus_file))?;
        let mut rng = StdRng::seed_from_u64(train_cfg.seed);
        let (features, _) = build_features(&sentences, &ctx, &cfg.split, false, &mut rng)?;

        // ── Step 3: Score ─────────────────────────────────────────────────────
        let scorer = Scorer::<B>::from_checkpoint(&ckpt_manager, cfg.checkpoint, device)?;
        let scored = scorer.score_dataset(DependencyDataset::new(features), cfg.batch_size)?;

        // ── Step 4: JSON lines ────────────────────────────────────────────────
        let file = File::create(&cfg.output_file)
            .with_context(|| format!("Cannot create '{}'", cfg.output_file))?;
        let mut writer = BufWriter::new(file);
        for sentence in &scored {
            serde_json::to_writer(&mut writer, sentence)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        tracing::info!("Wrote scores of {} sentences to '{}'", scored.len(), cfg.output_file);
        Ok(scored.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::data::context::InputConfig;
    use crate::domain::vocab::GraphVocab;
    use crate::ml::scorer::SentenceScores;
    use burn::backend::NdArray;
    use std::fs;

    type TestBackend = NdArray;

    const CORPUS: &str = "\
1\tThe\tthe\tDET\t_\t_\t2\tdet\t2:Det\t_
2\tdog\tdog\tNOUN\t_\t_\t3\tnsubj\t3:Agt\t_
3\truns\trun\tVERB\t_\t_\t0\troot\t0:Root\t_

1\tdog\tdog\tNOUN\t_\t_\t0\troot\t_\t_
";

    // A checkpoint directory as `train` leaves it, with untrained weights.
    fn checkpoint(dir: &std::path::Path) -> String {
        let path  = dir.join("ckpt").to_string_lossy().to_string();
        let ckpt  = CheckpointManager::new(path.clone()).unwrap();
        let tok   = TokenizerStore::new(path.clone())
            .load_or_build(["The", "dog", "runs"], 100)
            .unwrap();
        let vocab = GraphVocab::from_labels(["Root", "Agt", "Det"]).unwrap();

        let cfg = TrainConfig {
            input:               InputConfig { max_seq_len: 12, ..InputConfig::default() },
            d_model:             8,
            num_heads:           2,
            num_layers:          1,
            d_ff:                16,
            biaffine_hidden_dim: 4,
            vocab_size:          SubwordTokenizer::vocab_size(&tok),
            ..TrainConfig::default()
        };
        let model = cfg.model_config(vocab.len()).init::<TestBackend>(&Default::default());
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_vocab(&vocab).unwrap();
        ckpt.save_model(&model, 1).unwrap();
        path
    }

    #[test]
    fn test_scores_every_sentence() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("test.conllu");
        let output = dir.path().join("scores.jsonl");
        fs::write(&corpus, CORPUS).unwrap();

        let use_case = ScoreUseCase::new(ScoreConfig {
            corpus_file:    corpus.to_string_lossy().to_string(),
            checkpoint_dir: checkpoint(dir.path()),
            checkpoint:     CheckpointChoice::Best,
            output_file:    output.to_string_lossy().to_string(),
            split:          "test".to_string(),
            batch_size:     4,
        });
        let written = use_case.execute_on::<TestBackend>(Default::default()).unwrap();
        assert_eq!(written, 2);

        let lines: Vec<SentenceScores> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0].id, "test-0");
        assert_eq!(lines[0].word_count, 4);
        assert_eq!(lines[0].labeled[0][0].len(), 4);
        assert_eq!(lines[1].id, "test-1");
        assert_eq!(lines[1].unlabeled.len(), 2);
    }

    #[test]
    fn test_untrained_directory_is_an_error() {
        let dir      = tempfile::tempdir().unwrap();
        let use_case = ScoreUseCase::new(ScoreConfig {
            corpus_file:    "test.conllu".to_string(),
            checkpoint_dir: dir.path().to_string_lossy().to_string(),
            checkpoint:     CheckpointChoice::Latest,
            output_file:    dir.path().join("out.jsonl").to_string_lossy().to_string(),
            split:          "test".to_string(),
            batch_size:     4,
        });
        assert!(use_case.execute_on::<TestBackend>(Default::default()).is_err());
    }
}
