// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the parser core and its external
// collaborators:
//
//   SentenceSource   — yields raw (word, arc-spec) sentences
//                      (ConlluReader in the data layer)
//   SubwordTokenizer — the encoder's sub-word tokenizer
//                      (tokenizers::Tokenizer in the infra layer)
//
// Both are used through trait objects so tests can plug in
// small in-memory fakes.

use crate::domain::sentence::RawSentence;
use crate::error::Result;

// ─── SentenceSource ──────────────────────────────────────────────────────────
/// Anything that can produce the ordered sentences of a corpus.
pub trait SentenceSource {
    fn sentences(&self) -> Result<Vec<RawSentence>>;
}

// ─── SubwordTokenizer ────────────────────────────────────────────────────────
/// The external sub-word tokenizer of the contextual encoder.
///
/// `encode` must NOT add boundary tokens: the feature converter
/// places them itself according to the encoder layout table.
pub trait SubwordTokenizer: Send + Sync {
    /// Tokenize `text` into sub-word token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Id of a single vocabulary entry, if present.
    fn token_to_id(&self, token: &str) -> Option<u32>;

    /// Vocabulary size, special tokens included.
    fn vocab_size(&self) -> usize;

    /// True when `token` is one whole vocabulary entry.
    fn contains(&self, token: &str) -> bool {
        self.token_to_id(token).is_some()
    }
}
