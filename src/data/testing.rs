// In-memory tokenizer shared by the data-layer unit tests.
//
// Whitespace pieces found in the vocabulary (as written or
// lowercased) become one token; any other piece becomes one token
// per character, which mirrors `VocabLengthEstimator` so that
// estimated and real lengths agree in tests.

use std::collections::HashMap;

use crate::domain::traits::SubwordTokenizer;
use crate::error::Result;

pub const SPECIALS: [&str; 11] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "[unused1]",
    "<s>", "</s>", "<pad>", "<cls>", "<sep>",
];

pub struct FakeTokenizer {
    vocab: HashMap<String, u32>,
}

impl FakeTokenizer {
    pub fn new(words: &[&str]) -> Self {
        let mut vocab = HashMap::new();
        for token in SPECIALS.iter().chain(words.iter()) {
            let next = vocab.len() as u32;
            vocab.entry(token.to_string()).or_insert(next);
        }
        Self { vocab }
    }

    fn lookup(&self, piece: &str) -> Option<u32> {
        self.vocab
            .get(piece)
            .or_else(|| self.vocab.get(&piece.to_lowercase()))
            .copied()
    }
}

impl SubwordTokenizer for FakeTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let unk = self.vocab["[UNK]"];
        let mut ids = Vec::new();
        for piece in text.split_whitespace() {
            match self.lookup(piece) {
                Some(id) => ids.push(id),
                None => {
                    for c in piece.chars() {
                        ids.push(self.lookup(&c.to_string()).unwrap_or(unk));
                    }
                }
            }
        }
        Ok(ids)
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.get(token).copied()
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}
