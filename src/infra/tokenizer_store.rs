// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the encoder's sub-word tokenizer, or builds one from
// the training corpus when none is supplied.
//
// The built tokenizer is a WordLevel model written directly as
// tokenizer JSON (the trainer API of tokenizers 0.15 does not
// accept a plain WordLevel trainer for a `Tokenizer`):
//
//   normalizer     BertNormalizer (lowercase, spaces around Han chars)
//   pre-tokenizer  WhitespaceSplit
//   specials       [PAD] [UNK] [CLS] [SEP] [MASK] [unused1..3]
//
// Every corpus word becomes one entry; words containing Han
// characters contribute each character instead. With that
// vocabulary a known word is exactly one token, which is what
// the alignment length estimator assumes.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokenizers::{AddedToken, Tokenizer};

use crate::domain::traits::SubwordTokenizer;
use crate::error::PipelineError;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

const SPECIAL_TOKENS: [&str; 8] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "[unused1]", "[unused2]", "[unused3]",
];

/// Root placeholders; they must encode as single tokens.
const PLACEHOLDER_TOKENS: [&str; 3] = ["[unused1]", "[unused2]", "[unused3]"];

fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

// ─── SubwordTokenizer for tokenizers::Tokenizer ──────────────────────────────
impl SubwordTokenizer for Tokenizer {
    fn encode(&self, text: &str) -> crate::error::Result<Vec<u32>> {
        let encoding = (**self)
            .encode(text, false)
            .map_err(|e| PipelineError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn token_to_id(&self, token: &str) -> Option<u32> {
        (**self).token_to_id(token)
    }

    /// One past the largest id, so it can size an embedding table
    /// even when the vocabulary has gaps.
    fn vocab_size(&self) -> usize {
        (**self)
            .get_vocab(true)
            .values()
            .max()
            .map_or(0, |&id| id as usize + 1)
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the stored tokenizer, or build one from `words`.
    pub fn load_or_build<'a>(
        &self,
        words:      impl IntoIterator<Item = &'a str>,
        max_tokens: usize,
    ) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new word-level tokenizer (max_tokens={})", max_tokens);
            self.build_and_save(words, max_tokens)
        }
    }

    /// Load a previously saved tokenizer.
    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }

    /// Store a copy of an external tokenizer next to the checkpoints.
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        tokenizer
            .save(self.path(), true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", self.path().display()))
    }

    fn build_and_save<'a>(
        &self,
        words:      impl IntoIterator<Item = &'a str>,
        max_tokens: usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let vocab          = build_vocab(words, max_tokens);
        let tokenizer_json = tokenizer_json(&vocab);

        let tok_path = self.path();
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", tok_path.display()))?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            vocab.len(),
            tok_path.display()
        );
        load_tokenizer(&tok_path)
    }
}

/// Load a tokenizer.json and register the root placeholders as
/// special tokens, so a BERT pre-tokenizer cannot split `[unused1]`
/// into `[`, `unused1`, `]`.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
    let placeholders: Vec<AddedToken> = PLACEHOLDER_TOKENS
        .iter()
        .map(|&token| AddedToken::from(token, true))
        .collect();
    let added = tokenizer.add_special_tokens(&placeholders);
    tracing::debug!("Registered {added} placeholder tokens for '{}'", path.display());
    Ok(tokenizer)
}

/// Token → id, specials first, then corpus entries by descending
/// frequency (ties alphabetical), capped at `max_tokens` entries.
fn build_vocab<'a>(words: impl IntoIterator<Item = &'a str>, max_tokens: usize) -> Vec<(String, u32)> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in words {
        let word = word.to_lowercase();
        if word.chars().any(is_han) {
            for piece in word.split(is_han).filter(|p| !p.is_empty()) {
                *freq.entry(piece.to_string()).or_insert(0) += 1;
            }
            for c in word.chars().filter(|&c| is_han(c)) {
                *freq.entry(c.to_string()).or_insert(0) += 1;
            }
        } else if !word.trim().is_empty() {
            *freq.entry(word).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(token, _)| !SPECIAL_TOKENS.contains(&token.as_str()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(max_tokens.saturating_sub(SPECIAL_TOKENS.len()));

    SPECIAL_TOKENS
        .iter()
        .map(|s| s.to_string())
        .chain(entries.into_iter().map(|(token, _)| token))
        .enumerate()
        .map(|(id, token)| (token, id as u32))
        .collect()
}

fn tokenizer_json(vocab: &[(String, u32)]) -> serde_json::Value {
    let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, content)| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        })
        .collect();
    let vocab_map: serde_json::Map<String, serde_json::Value> = vocab
        .iter()
        .map(|(token, id)| (token.clone(), serde_json::json!(id)))
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "WhitespaceSplit"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab_map,
            "unk_token": "[UNK]"
        }
    })
}
