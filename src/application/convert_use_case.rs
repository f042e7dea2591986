// ============================================================
// Layer 2 — ConvertUseCase
// ============================================================
// Runs the feature pipeline over one corpus without touching a
// model: reports how many sentences convert and how many are
// skipped as too long, and optionally writes the features as
// JSON lines for inspection.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{
    conllu::ConlluReader,
    context::{InputConfig, PipelineContext},
    features::{build_features, ConversionReport},
};
use crate::domain::traits::{SentenceSource, SubwordTokenizer};
use crate::infra::{checkpoint::load_graph_vocab, tokenizer_store::load_tokenizer};

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub corpus_file:    String,
    pub vocab_file:     String,
    pub tokenizer_file: String,
    /// Prefix of the example ids (`<split>-<index>`)
    pub split:          String,
    /// Apply input corruption as during training
    pub training:       bool,
    pub seed:           u64,
    pub input:          InputConfig,
    /// Write one JSON feature per line here
    pub output_file:    Option<String>,
}

pub struct ConvertUseCase {
    config: ConvertConfig,
}

impl ConvertUseCase {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ConversionReport> {
        let cfg = &self.config;
        cfg.input.validate()?;

        let vocab = Arc::new(load_graph_vocab(Path::new(&cfg.vocab_file))?);
        let tokenizer: Arc<dyn SubwordTokenizer> =
            Arc::new(load_tokenizer(Path::new(&cfg.tokenizer_file))?);
        let ctx = PipelineContext::new(cfg.input.clone(), vocab, tokenizer)?;

        let sentences = ConlluReader::new(&cfg.corpus_file)
            .sentences()
            .with_context(|| format!("Cannot read corpus '{}'", cfg.corpus_file))?;

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (features, report) = build_features(&sentences, &ctx, &cfg.split, cfg.training, &mut rng)?;

        if let Some(output) = &cfg.output_file {
            let file = File::create(output)
                .with_context(|| format!("Cannot create '{output}'"))?;
            let mut writer = BufWriter::new(file);
            for feature in &features {
                serde_json::to_writer(&mut writer, feature)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            tracing::info!("Wrote {} features to '{}'", features.len(), output);
        }

        Ok(report)
    }
}
