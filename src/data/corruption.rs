// ============================================================
// Layer 4 — Input Corruption
// ============================================================
// Training-time input masking. Two granularities:
//
//   char → every Han ideograph (U+4E00..=U+9FA5) is replaced by
//          [MASK] with probability p. A Han character is always
//          one sub-word token, as is [MASK], so word positions do
//          not move.
//   word → every real word is replaced by [MASK] with probability
//          p. Word lengths change, so alignment must be computed
//          AFTER this step.
//
// The synthetic root word is never corrupted.
// Randomness comes from the caller's RNG (seeded in tests).

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const MASK_TOKEN: &str = "[MASK]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskGranularity {
    Char,
    Word,
}

impl FromStr for MaskGranularity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "char" => Ok(MaskGranularity::Char),
            "word" => Ok(MaskGranularity::Word),
            other  => Err(PipelineError::invalid_config(format!(
                "unknown input mask granularity '{other}' (expected char or word)"
            ))),
        }
    }
}

impl fmt::Display for MaskGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskGranularity::Char => write!(f, "char"),
            MaskGranularity::Word => write!(f, "word"),
        }
    }
}

fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputCorruption {
    pub granularity: MaskGranularity,
    /// Must lie in [0, 1]; checked by `InputConfig::validate`.
    pub prob:        f64,
}

impl InputCorruption {
    pub fn new(granularity: MaskGranularity, prob: f64) -> Self {
        Self { granularity, prob }
    }

    /// Replace Han characters of `text` with `[MASK]`.
    pub fn mask_chars<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if is_han(c) && rng.gen_bool(self.prob) {
                out.push_str(MASK_TOKEN);
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Replace whole words with `[MASK]`, leaving the first
    /// `protected` words (the synthetic root) untouched.
    pub fn mask_words<R: Rng + ?Sized>(&self, words: &mut [String], protected: usize, rng: &mut R) {
        for word in words.iter_mut().skip(protected) {
            if rng.gen_bool(self.prob) {
                *word = MASK_TOKEN.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_char_masking_touches_only_han() {
        let c   = InputCorruption::new(MaskGranularity::Char, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(c.mask_chars("a我b你", &mut rng), "a[MASK]b[MASK]");
    }

    #[test]
    fn test_char_masking_preserves_char_count_in_tokens() {
        let c   = InputCorruption::new(MaskGranularity::Char, 0.5);
        let mut rng = StdRng::seed_from_u64(3);
        let masked  = c.mask_chars("我们都喜欢它", &mut rng);
        let han     = masked.chars().filter(|&ch| is_han(ch)).count();
        let masks   = masked.matches(MASK_TOKEN).count();
        assert_eq!(han + masks, 6);
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let c   = InputCorruption::new(MaskGranularity::Word, 0.0);
        let mut rng   = StdRng::seed_from_u64(1);
        let mut words = vec!["[unused1]".to_string(), "dog".to_string()];
        c.mask_words(&mut words, 1, &mut rng);
        assert_eq!(words, vec!["[unused1]", "dog"]);
    }

    #[test]
    fn test_word_masking_protects_root() {
        let c   = InputCorruption::new(MaskGranularity::Word, 1.0);
        let mut rng   = StdRng::seed_from_u64(1);
        let mut words = vec!["root".to_string(), "dog".to_string(), "runs".to_string()];
        c.mask_words(&mut words, 1, &mut rng);
        assert_eq!(words, vec!["root", MASK_TOKEN, MASK_TOKEN]);
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("word".parse::<MaskGranularity>().unwrap(), MaskGranularity::Word);
        assert!("token".parse::<MaskGranularity>().is_err());
    }
}
