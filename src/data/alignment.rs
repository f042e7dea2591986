// ============================================================
// Layer 4 — Alignment Builder
// ============================================================
// Maps every word of a sentence to the [start, end] span of
// sub-word positions it will occupy in the final token sequence
//
//   [CLS] [unused1] the dog runs [SEP]
//     0       1      2   3    4    5
//
// Slot 0 of the output is always the virtual root:
//
//   boundary-token → root is the encoder's own [CLS]   (position 0)
//   placeholder    → `[unused1]` is prepended as root  (position 1)
//   literal        → a marker word is prepended as root (position 1)
//
// Sub-word lengths are NOT obtained by re-tokenizing each word.
// A `LengthEstimator` approximates them; the default one assumes
// a word that is a whole vocabulary entry is one token and any
// other word is one token per character. The true count can
// differ for some tokenizers; swap the estimator to change that.
//
// Every position is clamped to `max_seq_len - 1`, which is also
// the padding sentinel, so a clamped word and a padded slot hold
// the same value.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::domain::traits::SubwordTokenizer;
use crate::error::PipelineError;

/// Reserved vocabulary entry used by the placeholder policy.
pub const PLACEHOLDER_ROOT: &str = "[unused1]";

/// Default literal marker.
pub const DEFAULT_LITERAL_ROOT: &str = "root";

// ─── Root Representation ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootRepresentation {
    /// The encoder's leading boundary token stands for the root.
    BoundaryToken,
    /// `[unused1]` is prepended to the words.
    Placeholder,
    /// The given marker word is prepended to the words.
    Literal(String),
}

impl RootRepresentation {
    /// Word prepended to the sentence, if the policy needs one.
    pub fn root_word(&self) -> Option<&str> {
        match self {
            RootRepresentation::BoundaryToken => None,
            RootRepresentation::Placeholder   => Some(PLACEHOLDER_ROOT),
            RootRepresentation::Literal(m)    => Some(m.as_str()),
        }
    }

    /// Sequence position of the root slot.
    pub fn root_position(&self) -> usize {
        match self {
            RootRepresentation::BoundaryToken => 0,
            _ => 1,
        }
    }

    /// Sequence position of the first real word.
    pub fn first_word_position(&self) -> usize {
        self.root_position() + 1
    }
}

impl Default for RootRepresentation {
    fn default() -> Self {
        RootRepresentation::Placeholder
    }
}

impl FromStr for RootRepresentation {
    type Err = PipelineError;

    /// Accepts `boundary-token` / `cls`, `placeholder` / `unused`,
    /// `literal` (marker `root`), `literal:<marker>`, and the bare
    /// markers `root` and `根`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boundary-token" | "cls" => Ok(RootRepresentation::BoundaryToken),
            "placeholder" | "unused" => Ok(RootRepresentation::Placeholder),
            "literal"                => Ok(RootRepresentation::Literal(DEFAULT_LITERAL_ROOT.into())),
            "root" | "根"            => Ok(RootRepresentation::Literal(s.to_string())),
            other => match other.strip_prefix("literal:") {
                Some(marker) if !marker.trim().is_empty() => {
                    Ok(RootRepresentation::Literal(marker.trim().to_string()))
                }
                _ => Err(PipelineError::UnknownRootRepresentation(other.to_string())),
            },
        }
    }
}

impl fmt::Display for RootRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootRepresentation::BoundaryToken => write!(f, "boundary-token"),
            RootRepresentation::Placeholder   => write!(f, "placeholder"),
            RootRepresentation::Literal(m)    => write!(f, "literal:{m}"),
        }
    }
}

// ─── Length Estimation ───────────────────────────────────────────────────────
/// Estimates how many sub-word tokens a word will produce.
pub trait LengthEstimator: Send + Sync {
    fn subword_len(&self, word: &str) -> usize;
}

/// Vocabulary heuristic: a word found in the tokenizer vocabulary
/// (as written or lowercased) counts as one token, anything else
/// as one token per character.
pub struct VocabLengthEstimator {
    tokenizer: Arc<dyn SubwordTokenizer>,
}

impl VocabLengthEstimator {
    pub fn new(tokenizer: Arc<dyn SubwordTokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl LengthEstimator for VocabLengthEstimator {
    fn subword_len(&self, word: &str) -> usize {
        if self.tokenizer.contains(word) || self.tokenizer.contains(&word.to_lowercase()) {
            1
        } else {
            word.chars().count().max(1)
        }
    }
}

// ─── Position Computation ────────────────────────────────────────────────────
/// Compute per-word `(start_pos, end_pos)`.
///
/// `words` must already carry the prepended root word when the
/// policy has one; the output then has `words.len()` entries.
/// Under the boundary-token policy the root slot has no word and
/// the output has `words.len() + 1` entries.
pub fn compute_positions(
    words:       &[String],
    max_seq_len: usize,
    root:        &RootRepresentation,
    estimator:   &dyn LengthEstimator,
) -> (Vec<usize>, Vec<usize>) {
    let last  = max_seq_len.saturating_sub(1);
    let clamp = |p: usize| p.min(last);

    let content: &[String] = match root.root_word() {
        Some(_) => words.get(1..).unwrap_or(&[]),
        None    => words,
    };

    let mut start = Vec::with_capacity(content.len() + 1);
    let mut end   = Vec::with_capacity(content.len() + 1);
    start.push(clamp(root.root_position()));
    end.push(clamp(root.root_position()));

    let mut cursor = root.first_word_position();
    for word in content {
        start.push(clamp(cursor));
        cursor += estimator.subword_len(word);
        end.push(clamp(cursor - 1));
    }

    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::FakeTokenizer;

    fn estimator(vocab: &[&str]) -> VocabLengthEstimator {
        VocabLengthEstimator::new(Arc::new(FakeTokenizer::new(vocab)))
    }

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_placeholder_scenario() {
        let est = estimator(&["the", "dog", "runs"]);
        let ws  = words(&[PLACEHOLDER_ROOT, "The", "dog", "runs"]);
        let (s, e) = compute_positions(&ws, 10, &RootRepresentation::Placeholder, &est);
        assert_eq!(s, vec![1, 2, 3, 4]);
        assert_eq!(e, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unknown_word_spans_its_characters() {
        let est = estimator(&["the"]);
        let ws  = words(&["the", "xyz", "the"]);
        let (s, e) = compute_positions(&ws, 32, &RootRepresentation::BoundaryToken, &est);
        assert_eq!(s, vec![0, 1, 2, 5]);
        assert_eq!(e, vec![0, 1, 4, 5]);
    }

    #[test]
    fn test_policies_shift_by_constant_offset() {
        let est     = estimator(&["the", "dog", "runs", "root"]);
        let content = words(&["The", "dog", "runs"]);

        let (cls_s, cls_e) =
            compute_positions(&content, 16, &RootRepresentation::BoundaryToken, &est);

        let mut with_placeholder = words(&[PLACEHOLDER_ROOT]);
        with_placeholder.extend(content.iter().cloned());
        let (ph_s, ph_e) =
            compute_positions(&with_placeholder, 16, &RootRepresentation::Placeholder, &est);

        let literal = RootRepresentation::Literal("root".into());
        let mut with_literal = words(&["root"]);
        with_literal.extend(content.iter().cloned());
        let (lit_s, lit_e) = compute_positions(&with_literal, 16, &literal, &est);

        assert_eq!(cls_s.len(), ph_s.len());
        for i in 1..cls_s.len() {
            assert_eq!(ph_s[i], cls_s[i] + 1);
            assert_eq!(ph_e[i], cls_e[i] + 1);
            assert_eq!(lit_s[i], ph_s[i]);
            assert_eq!(lit_e[i], ph_e[i]);
        }
        assert_eq!(cls_s[0], 0);
        assert_eq!(ph_s[0], 1);
    }

    #[test]
    fn test_positions_clamped_to_sentinel() {
        let est = estimator(&[]);
        let ws  = words(&[PLACEHOLDER_ROOT, "abcdef", "gh"]);
        let (s, e) = compute_positions(&ws, 6, &RootRepresentation::Placeholder, &est);
        // "abcdef" starts at 2 and would end at 7, "gh" would start at 8
        assert_eq!(s, vec![1, 2, 5]);
        assert_eq!(e, vec![1, 5, 5]);
    }

    #[test]
    fn test_clamped_word_indistinguishable_from_padding() {
        let est = estimator(&[]);
        let ws  = words(&["abcdefgh"]);
        let (_, e) = compute_positions(&ws, 4, &RootRepresentation::BoundaryToken, &est);
        let sentinel = 4 - 1;
        assert_eq!(e[1], sentinel);
    }

    #[test]
    fn test_uppercase_special_token_counts_as_one() {
        let est = estimator(&["[MASK]"]);
        assert_eq!(est.subword_len("[MASK]"), 1);
        assert_eq!(est.subword_len("[MASKED]"), 8);
    }

    #[test]
    fn test_parse_root_representation() {
        assert_eq!("cls".parse::<RootRepresentation>().unwrap(), RootRepresentation::BoundaryToken);
        assert_eq!("unused".parse::<RootRepresentation>().unwrap(), RootRepresentation::Placeholder);
        assert_eq!(
            "根".parse::<RootRepresentation>().unwrap(),
            RootRepresentation::Literal("根".into())
        );
        assert_eq!(
            "literal:ROOT".parse::<RootRepresentation>().unwrap(),
            RootRepresentation::Literal("ROOT".into())
        );
        assert!(matches!(
            "sep".parse::<RootRepresentation>(),
            Err(PipelineError::UnknownRootRepresentation(_))
        ));
    }
}
