// ============================================================
// Layer 4 — Example Builder
// ============================================================
// Raw corpus sentence → Example
//
//   1. Resolve every row's arc-spec against the graph vocabulary
//      (`parse_sentence`).
//   2. Prepend the root word required by the root policy.
//   3. Training only: corrupt the input.
//        word → words replaced BEFORE alignment
//        char → text masked AFTER alignment (one Han char and
//               one [MASK] are both one token)
//   4. Compute word positions and join the text.
//
// Examples are immutable once built.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::alignment::compute_positions;
use crate::data::context::PipelineContext;
use crate::data::corruption::MaskGranularity;
use crate::domain::sentence::{ArcGraph, DepArc, RawSentence, Sentence, NO_ARCS};
use crate::domain::vocab::GraphVocab;
use crate::error::{PipelineError, Result};

/// One aligned sentence, ready for feature conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// `"{split}-{index}"`
    pub id:        String,
    pub text:      String,
    pub start_pos: Vec<usize>,
    pub end_pos:   Vec<usize>,
    pub arcs:      Option<ArcGraph>,
}

impl Example {
    /// Word slots, root slot included.
    pub fn word_slots(&self) -> usize {
        self.start_pos.len()
    }
}

pub fn example_id(split: &str, index: usize) -> String {
    format!("{split}-{index}")
}

// ─── Arc-spec Parsing ────────────────────────────────────────────────────────
/// Parse one `head:relation|head:relation` arc-spec.
pub fn parse_arc_spec(spec: &str, vocab: &GraphVocab, example: &str, row: usize) -> Result<Vec<DepArc>> {
    if spec == NO_ARCS {
        return Ok(Vec::new());
    }
    spec.split('|')
        .map(|pair| {
            let (head, label) = pair.split_once(':').ok_or_else(|| {
                PipelineError::malformed(example, row, format!("arc '{pair}' is not head:relation"))
            })?;
            let head: usize = head.trim().parse().map_err(|_| {
                PipelineError::malformed(example, row, format!("head '{head}' is not a word index"))
            })?;
            let relation = vocab.id(label.trim()).ok_or_else(|| PipelineError::UnknownLabel {
                example: example.to_string(),
                label:   label.trim().to_string(),
            })?;
            Ok(DepArc::new(head, relation))
        })
        .collect()
}

/// Resolve a raw sentence into words plus an optional arc graph.
///
/// A sentence whose rows are all `_` is unannotated. Leading `_`
/// rows are allowed; a `_` row after an arc-bearing row is not.
pub fn parse_sentence(raw: &RawSentence, vocab: &GraphVocab, example: &str) -> Result<Sentence> {
    let mut words    = Vec::with_capacity(raw.len());
    let mut graph    = Vec::with_capacity(raw.len());
    let mut seen_arc = false;

    for (row, entry) in raw.rows.iter().enumerate() {
        if entry.has_arcs() {
            seen_arc = true;
        } else if seen_arc {
            return Err(PipelineError::malformed(
                example,
                row,
                "row without arcs follows an annotated row",
            ));
        }
        graph.push(parse_arc_spec(&entry.arc_spec, vocab, example, row)?);
        words.push(entry.word.clone());
    }

    Ok(Sentence::new(words, seen_arc.then_some(graph)))
}

// ─── Builder ─────────────────────────────────────────────────────────────────
pub struct ExampleBuilder<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> ExampleBuilder<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Build the example of one sentence. Corruption only applies
    /// when `training` is set and enabled in the configuration.
    pub fn build<R: Rng + ?Sized>(&self, id: String, sentence: &Sentence, training: bool, rng: &mut R) -> Example {
        let config     = &self.ctx.config;
        let root       = &config.root_representation;
        let corruption = if training { config.corruption() } else { None };

        let mut words: Vec<String> = Vec::with_capacity(sentence.words.len() + 1);
        let protected = match root.root_word() {
            Some(root_word) => {
                words.push(root_word.to_string());
                1
            }
            None => 0,
        };
        words.extend(sentence.words.iter().cloned());

        if let Some(c) = corruption.filter(|c| c.granularity == MaskGranularity::Word) {
            c.mask_words(&mut words, protected, rng);
        }

        let (start_pos, end_pos) =
            compute_positions(&words, config.max_seq_len, root, self.ctx.estimator.as_ref());

        if let Some(c) = corruption.filter(|c| c.granularity == MaskGranularity::Char) {
            for word in words.iter_mut().skip(protected) {
                *word = c.mask_chars(word, rng);
            }
        }

        Example {
            id,
            text: words.join(&config.word_separator),
            start_pos,
            end_pos,
            arcs: sentence.arcs.clone(),
        }
    }
}
