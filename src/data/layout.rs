// ============================================================
// Layer 4 — Encoder Layout Table
// ============================================================
// Where boundary tokens go, how many separators follow the
// content, which side gets padded and which segment ids the
// boundary token and padding use all depend on the encoder
// family. These four axes live in one static table instead of
// being re-derived from family names for every example:
//
//   family   boundary  separators  padding  boundary seg  pad seg
//   bert     start     single      right    0             0
//   roberta  start     double      right    0             0
//   xlm      start     single      right    0             0
//   xlnet    end       single      left     2             4
//
// `EncoderLayout::resolve` looks the special tokens up in the
// tokenizer once, at load time. Word positions are computed for
// the canonical layout ([CLS] first, no left padding) and
// remapped onto the real one by `AssembledSequence::remap`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::traits::SubwordTokenizer;
use crate::error::{PipelineError, Result};

/// Positions kept free for the root representation on top of the
/// boundary tokens.
pub const ROOT_MARGIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderFamily {
    Bert,
    Roberta,
    Xlm,
    Xlnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPlacement {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderLayout {
    pub boundary:            BoundaryPlacement,
    pub double_separator:    bool,
    pub padding:             PaddingSide,
    pub boundary_segment_id: u32,
    pub pad_segment_id:      u32,
    pub content_segment_id:  u32,
    pub cls_token:           String,
    pub sep_token:           String,
    pub pad_token:           String,
}

struct LayoutRow {
    family:              EncoderFamily,
    boundary:            BoundaryPlacement,
    double_separator:    bool,
    padding:             PaddingSide,
    boundary_segment_id: u32,
    pad_segment_id:      u32,
    cls:                 &'static str,
    sep:                 &'static str,
    pad:                 &'static str,
}

const LAYOUT_TABLE: [LayoutRow; 4] = [
    LayoutRow {
        family: EncoderFamily::Bert, boundary: BoundaryPlacement::Start,
        double_separator: false, padding: PaddingSide::Right,
        boundary_segment_id: 0, pad_segment_id: 0,
        cls: "[CLS]", sep: "[SEP]", pad: "[PAD]",
    },
    LayoutRow {
        family: EncoderFamily::Roberta, boundary: BoundaryPlacement::Start,
        double_separator: true, padding: PaddingSide::Right,
        boundary_segment_id: 0, pad_segment_id: 0,
        cls: "<s>", sep: "</s>", pad: "<pad>",
    },
    LayoutRow {
        family: EncoderFamily::Xlm, boundary: BoundaryPlacement::Start,
        double_separator: false, padding: PaddingSide::Right,
        boundary_segment_id: 0, pad_segment_id: 0,
        cls: "<s>", sep: "</s>", pad: "<pad>",
    },
    LayoutRow {
        family: EncoderFamily::Xlnet, boundary: BoundaryPlacement::End,
        double_separator: false, padding: PaddingSide::Left,
        boundary_segment_id: 2, pad_segment_id: 4,
        cls: "<cls>", sep: "<sep>", pad: "<pad>",
    },
];

impl EncoderFamily {
    pub fn layout(self) -> EncoderLayout {
        let row = LAYOUT_TABLE
            .iter()
            .find(|row| row.family == self)
            .unwrap_or(&LAYOUT_TABLE[0]);
        EncoderLayout {
            boundary:            row.boundary,
            double_separator:    row.double_separator,
            padding:             row.padding,
            boundary_segment_id: row.boundary_segment_id,
            pad_segment_id:      row.pad_segment_id,
            content_segment_id:  0,
            cls_token:           row.cls.to_string(),
            sep_token:           row.sep.to_string(),
            pad_token:           row.pad.to_string(),
        }
    }
}

impl Default for EncoderFamily {
    fn default() -> Self {
        EncoderFamily::Bert
    }
}

impl FromStr for EncoderFamily {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bert"    => Ok(EncoderFamily::Bert),
            "roberta" => Ok(EncoderFamily::Roberta),
            "xlm"     => Ok(EncoderFamily::Xlm),
            "xlnet"   => Ok(EncoderFamily::Xlnet),
            other     => Err(PipelineError::invalid_config(format!(
                "unknown encoder family '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EncoderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncoderFamily::Bert    => "bert",
            EncoderFamily::Roberta => "roberta",
            EncoderFamily::Xlm     => "xlm",
            EncoderFamily::Xlnet   => "xlnet",
        };
        f.write_str(name)
    }
}

impl EncoderLayout {
    pub fn separator_count(&self) -> usize {
        if self.double_separator { 2 } else { 1 }
    }

    /// Boundary + separator tokens added around the content.
    pub fn special_token_count(&self) -> usize {
        1 + self.separator_count()
    }

    /// Positions reserved before content tokens are counted against
    /// `max_seq_len`.
    pub fn reserved_slack(&self) -> usize {
        self.special_token_count() + ROOT_MARGIN
    }

    /// Look up the special tokens once.
    pub fn resolve(&self, tokenizer: &dyn SubwordTokenizer) -> Result<ResolvedLayout> {
        let lookup = |token: &str| {
            tokenizer.token_to_id(token).ok_or_else(|| {
                PipelineError::invalid_config(format!(
                    "special token '{token}' is not in the tokenizer vocabulary"
                ))
            })
        };
        Ok(ResolvedLayout {
            cls_id: lookup(&self.cls_token)?,
            sep_id: lookup(&self.sep_token)?,
            pad_id: lookup(&self.pad_token)?,
            layout: self.clone(),
        })
    }
}

// ─── Resolved Layout ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub layout: EncoderLayout,
    pub cls_id: u32,
    pub sep_id: u32,
    pub pad_id: u32,
}

/// One padded token sequence plus what is needed to remap word
/// positions onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledSequence {
    pub token_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub segment_ids:    Vec<u32>,
    /// Index of the boundary token before padding is applied
    pub boundary_index: usize,
    /// Number of padding tokens
    pub padding_len:    usize,
    pub padding:        PaddingSide,
    pub boundary:       BoundaryPlacement,
}

impl ResolvedLayout {
    /// Surround `content` with boundary/separator tokens and pad to
    /// `max_seq_len`. The caller guarantees `content` fits.
    pub fn assemble(&self, content: &[u32], max_seq_len: usize) -> AssembledSequence {
        let layout = &self.layout;

        let mut tokens   = content.to_vec();
        let mut segments = vec![layout.content_segment_id; content.len()];
        for _ in 0..layout.separator_count() {
            tokens.push(self.sep_id);
            segments.push(layout.content_segment_id);
        }

        let boundary_index = match layout.boundary {
            BoundaryPlacement::Start => {
                tokens.insert(0, self.cls_id);
                segments.insert(0, layout.boundary_segment_id);
                0
            }
            BoundaryPlacement::End => {
                tokens.push(self.cls_id);
                segments.push(layout.boundary_segment_id);
                tokens.len() - 1
            }
        };

        let real_len    = tokens.len();
        let padding_len = max_seq_len.saturating_sub(real_len);
        let mut mask    = vec![1u32; real_len];

        match layout.padding {
            PaddingSide::Right => {
                tokens.extend(std::iter::repeat(self.pad_id).take(padding_len));
                mask.extend(std::iter::repeat(0).take(padding_len));
                segments.extend(std::iter::repeat(layout.pad_segment_id).take(padding_len));
            }
            PaddingSide::Left => {
                tokens.splice(0..0, std::iter::repeat(self.pad_id).take(padding_len));
                mask.splice(0..0, std::iter::repeat(0).take(padding_len));
                segments.splice(0..0, std::iter::repeat(layout.pad_segment_id).take(padding_len));
            }
        }

        AssembledSequence {
            token_ids: tokens,
            attention_mask: mask,
            segment_ids: segments,
            boundary_index,
            padding_len,
            padding: layout.padding,
            boundary: layout.boundary,
        }
    }
}

impl AssembledSequence {
    /// Move a canonical-layout position onto this sequence.
    /// Clamped positions (`max_seq_len - 1`) are left untouched.
    pub fn remap(&self, position: usize, max_seq_len: usize) -> usize {
        let last = max_seq_len.saturating_sub(1);
        if position >= last {
            return last;
        }
        let shifted = match self.boundary {
            BoundaryPlacement::Start => position,
            BoundaryPlacement::End if position == 0 => self.boundary_index,
            BoundaryPlacement::End => position - 1,
        };
        let shifted = match self.padding {
            PaddingSide::Right => shifted,
            PaddingSide::Left  => shifted + self.padding_len,
        };
        shifted.min(last)
    }
}
