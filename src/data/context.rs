// ============================================================
// Layer 4 — Input Configuration and Pipeline Context
// ============================================================
// `InputConfig` is the serialisable configuration surface of the
// feature pipeline. `PipelineContext` bundles it with everything
// the builders read but never modify:
//
//   - the graph vocabulary
//   - the sub-word tokenizer
//   - the resolved encoder layout (special token ids)
//   - the sub-word length estimator
//
// The context is built once per run and passed explicitly to
// every builder/converter call; it is Send + Sync so conversion
// can fan out across rayon workers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::alignment::{LengthEstimator, RootRepresentation, VocabLengthEstimator};
use crate::data::corruption::{InputCorruption, MaskGranularity};
use crate::data::layout::{EncoderFamily, EncoderLayout, ResolvedLayout};
use crate::domain::traits::SubwordTokenizer;
use crate::domain::vocab::GraphVocab;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub max_seq_len:            usize,
    pub root_representation:    RootRepresentation,
    pub encoder_family:         EncoderFamily,
    /// Explicit layout overriding the family's table row
    #[serde(default)]
    pub layout_override:        Option<EncoderLayout>,
    /// Skip over-long sentences (true) or hard-truncate them (false)
    pub skip_too_long_input:    bool,
    /// Corrupt training input
    pub input_mask:             bool,
    pub input_mask_granularity: MaskGranularity,
    pub input_mask_prob:        f64,
    /// Joins words into the sentence text handed to the tokenizer
    pub word_separator:         String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_seq_len:            128,
            root_representation:    RootRepresentation::Placeholder,
            encoder_family:         EncoderFamily::Bert,
            layout_override:        None,
            skip_too_long_input:    true,
            input_mask:             false,
            input_mask_granularity: MaskGranularity::Char,
            input_mask_prob:        0.1,
            word_separator:         " ".to_string(),
        }
    }
}

impl InputConfig {
    pub fn layout(&self) -> EncoderLayout {
        self.layout_override
            .clone()
            .unwrap_or_else(|| self.encoder_family.layout())
    }

    /// Corruption settings, if corruption is enabled.
    pub fn corruption(&self) -> Option<InputCorruption> {
        self.input_mask
            .then(|| InputCorruption::new(self.input_mask_granularity, self.input_mask_prob))
    }

    pub fn validate(&self) -> Result<()> {
        let slack = self.layout().reserved_slack();
        if self.max_seq_len <= slack {
            return Err(PipelineError::invalid_config(format!(
                "max_seq_len {} leaves no room for content (reserved: {slack})",
                self.max_seq_len
            )));
        }
        if !(0.0..=1.0).contains(&self.input_mask_prob) {
            return Err(PipelineError::invalid_config(format!(
                "input_mask_prob {} is not a probability",
                self.input_mask_prob
            )));
        }
        if let RootRepresentation::Literal(marker) = &self.root_representation {
            if marker.trim().is_empty() {
                return Err(PipelineError::UnknownRootRepresentation(marker.clone()));
            }
        }
        Ok(())
    }
}

// ─── PipelineContext ─────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct PipelineContext {
    pub config:    InputConfig,
    pub vocab:     Arc<GraphVocab>,
    pub tokenizer: Arc<dyn SubwordTokenizer>,
    pub layout:    ResolvedLayout,
    pub estimator: Arc<dyn LengthEstimator>,
}

impl PipelineContext {
    /// Validate the configuration and resolve the encoder layout.
    pub fn new(
        config:    InputConfig,
        vocab:     Arc<GraphVocab>,
        tokenizer: Arc<dyn SubwordTokenizer>,
    ) -> Result<Self> {
        config.validate()?;
        let layout    = config.layout().resolve(tokenizer.as_ref())?;
        let estimator = Arc::new(VocabLengthEstimator::new(tokenizer.clone()));
        tracing::debug!(
            "Pipeline context: max_seq_len={}, root={}, family={}",
            config.max_seq_len,
            config.root_representation,
            config.encoder_family,
        );
        Ok(Self { config, vocab, tokenizer, layout, estimator })
    }

    /// Replace the sub-word length heuristic.
    pub fn with_estimator(mut self, estimator: Arc<dyn LengthEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Content tokens allowed before the over-length policy kicks in.
    pub fn token_budget(&self) -> usize {
        self.config
            .max_seq_len
            .saturating_sub(self.layout.layout.reserved_slack())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(InputConfig::default().validate().is_ok());
    }

    #[test]
    fn test_tiny_max_seq_len_rejected() {
        let cfg = InputConfig { max_seq_len: 5, ..InputConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_probability_rejected() {
        let cfg = InputConfig { input_mask_prob: 1.5, ..InputConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_layout_override_replaces_family_row() {
        let mut custom = EncoderFamily::Bert.layout();
        custom.double_separator = true;
        let cfg = InputConfig {
            layout_override: Some(custom.clone()),
            ..InputConfig::default()
        };
        assert_eq!(cfg.layout(), custom);
        assert_eq!(
            cfg.layout().reserved_slack(),
            EncoderFamily::Bert.layout().reserved_slack() + 1
        );
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = InputConfig {
            root_representation: RootRepresentation::Literal("根".into()),
            ..InputConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: InputConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
