// ============================================================
// Layer 4 — Feature Converter
// ============================================================
// Example → fixed-length Feature
//
//   text ──tokenize──▶ content ids ──budget──▶ skip │ truncate
//                                       │
//                    EncoderLayout::assemble (boundary, separators,
//                                       │     padding, segments)
//                                       ▼
//   start/end ──remap onto layout──▶ pad with sentinel
//   arcs ──build_label_matrix──▶ max_seq_len × max_seq_len
//
// Every array is checked against `max_seq_len` before the feature
// leaves this module; a wrong length is an error, never coerced.
//
// A pass over many examples fans out over rayon. The pipeline
// context is the only shared state and it is read-only; output
// order equals input order.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::context::PipelineContext;
use crate::data::example::{example_id, parse_sentence, Example, ExampleBuilder};
use crate::data::label_matrix::{build_label_matrix, LabelMatrix};
use crate::domain::sentence::RawSentence;
use crate::error::{PipelineError, Result};

/// Model-ready arrays of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id:             String,
    pub token_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub segment_ids:    Vec<u32>,
    pub start_pos:      Vec<usize>,
    pub end_pos:        Vec<usize>,
    pub labels:         LabelMatrix,
    /// Real word slots (root included) before sentinel padding
    pub word_count:     usize,
}

/// Counts of one conversion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub total:     usize,
    pub converted: usize,
    pub skipped:   usize,
}

// ─── Converter ───────────────────────────────────────────────────────────────
pub struct FeatureConverter<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> FeatureConverter<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Convert one example. `Ok(None)` means it was too long and the
    /// configuration asks to skip such examples.
    pub fn convert(&self, example: &Example) -> Result<Option<Feature>> {
        let max_seq_len = self.ctx.config.max_seq_len;
        let budget      = self.ctx.token_budget();

        if example.start_pos.len() != example.end_pos.len() {
            return Err(PipelineError::PositionLengthMismatch {
                example: example.id.clone(),
                start:   example.start_pos.len(),
                end:     example.end_pos.len(),
            });
        }

        let mut tokens    = self.ctx.tokenizer.encode(&example.text)?;
        let mut start_pos = example.start_pos.clone();
        let mut end_pos   = example.end_pos.clone();

        if tokens.len() > budget || start_pos.len() > max_seq_len {
            if self.ctx.config.skip_too_long_input {
                tracing::debug!(
                    "{}: {} tokens / {} word slots over budget, skipped",
                    example.id,
                    tokens.len(),
                    start_pos.len()
                );
                return Ok(None);
            }
            tokens.truncate(budget);
            start_pos.truncate(max_seq_len);
            end_pos.truncate(max_seq_len);
        }

        if tokens.len() > budget {
            return Err(PipelineError::TokenBudget {
                example: example.id.clone(),
                tokens:  tokens.len(),
                budget,
            });
        }

        let sequence   = self.ctx.layout.assemble(&tokens, max_seq_len);
        let word_count = start_pos.len();
        let sentinel   = max_seq_len - 1;
        let pad_slots  = |positions: Vec<usize>| -> Vec<usize> {
            let mut out: Vec<usize> = positions
                .into_iter()
                .map(|p| sequence.remap(p, max_seq_len))
                .collect();
            out.resize(max_seq_len, sentinel);
            out
        };
        let start_pos = pad_slots(start_pos);
        let end_pos   = pad_slots(end_pos);

        let feature = Feature {
            id: example.id.clone(),
            token_ids: sequence.token_ids.clone(),
            attention_mask: sequence.attention_mask.clone(),
            segment_ids: sequence.segment_ids.clone(),
            start_pos,
            end_pos,
            labels: build_label_matrix(example.arcs.as_ref(), max_seq_len),
            word_count,
        };
        check_lengths(&feature, max_seq_len)?;
        Ok(Some(feature))
    }

    /// Convert a whole split in parallel, dropping skipped examples.
    pub fn convert_all(&self, examples: &[Example]) -> Result<(Vec<Feature>, ConversionReport)> {
        let converted: Vec<Option<Feature>> = examples
            .par_iter()
            .map(|example| self.convert(example))
            .collect::<Result<_>>()?;

        let features: Vec<Feature> = converted.into_iter().flatten().collect();
        let report = ConversionReport {
            total:     examples.len(),
            converted: features.len(),
            skipped:   examples.len() - features.len(),
        };
        if report.skipped > 0 {
            tracing::warn!(
                "Skipped {} of {} examples longer than max_seq_len={}",
                report.skipped,
                report.total,
                self.ctx.config.max_seq_len
            );
        }
        Ok((features, report))
    }
}

fn check_lengths(feature: &Feature, expected: usize) -> Result<()> {
    let fields: [(&'static str, usize); 6] = [
        ("token_ids",      feature.token_ids.len()),
        ("attention_mask", feature.attention_mask.len()),
        ("segment_ids",    feature.segment_ids.len()),
        ("start_pos",      feature.start_pos.len()),
        ("end_pos",        feature.end_pos.len()),
        ("labels",         feature.labels.size()),
    ];
    for (field, actual) in fields {
        if actual != expected {
            return Err(PipelineError::FeatureLength {
                example: feature.id.clone(),
                field,
                actual,
                expected,
            });
        }
    }
    Ok(())
}

// ─── Full Pass ───────────────────────────────────────────────────────────────
/// Raw corpus sentences → features of one split.
///
/// Examples are built sequentially (the RNG drives corruption),
/// then converted in parallel.
pub fn build_features<R: Rng + ?Sized>(
    sentences: &[RawSentence],
    ctx:       &PipelineContext,
    split:     &str,
    training:  bool,
    rng:       &mut R,
) -> Result<(Vec<Feature>, ConversionReport)> {
    build_indexed_features(sentences.iter().enumerate(), ctx, split, training, rng)
}

/// Same as `build_features`, with the corpus index of every
/// sentence given explicitly. Ids are `{split}-{index}`.
pub fn build_indexed_features<'a, R: Rng + ?Sized>(
    sentences: impl IntoIterator<Item = (usize, &'a RawSentence)>,
    ctx:       &PipelineContext,
    split:     &str,
    training:  bool,
    rng:       &mut R,
) -> Result<(Vec<Feature>, ConversionReport)> {
    let builder  = ExampleBuilder::new(ctx);
    let examples = sentences
        .into_iter()
        .map(|(index, raw)| {
            let id       = example_id(split, index);
            let sentence = parse_sentence(raw, &ctx.vocab, &id)?;
            Ok(builder.build(id, &sentence, training, rng))
        })
        .collect::<Result<Vec<_>>>()?;

    let (features, report) = FeatureConverter::new(ctx).convert_all(&examples)?;
    tracing::info!(
        "{split}: {} sentences → {} features ({} skipped)",
        report.total,
        report.converted,
        report.skipped
    );
    Ok((features, report))
}
