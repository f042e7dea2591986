// ============================================================
// Layer 5 — Word Pooling
// ============================================================
// Per-token vectors → per-word vectors
//
//   hidden [B, L, H] + start_pos [B, W] + end_pos [B, W] → [B, W, H]
//
// Slot w of the output is word w (slot 0 = root). Padded slots
// point at the sentinel position and pick up whatever vector
// sits there; the loss masks them out.

use std::{fmt, str::FromStr};

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordPooling {
    /// First sub-word of the word
    Start,
    /// Last sub-word of the word
    End,
    /// First + last
    Sum,
    /// (first + last) / 2
    Mean,
}

impl Default for WordPooling {
    fn default() -> Self {
        WordPooling::Sum
    }
}

impl FromStr for WordPooling {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" | "s" => Ok(WordPooling::Start),
            "end" | "e"   => Ok(WordPooling::End),
            "sum" | "s+e" => Ok(WordPooling::Sum),
            "mean"        => Ok(WordPooling::Mean),
            other => Err(PipelineError::invalid_config(format!(
                "unknown word pooling '{other}' (expected start, end, sum or mean)"
            ))),
        }
    }
}

impl fmt::Display for WordPooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WordPooling::Start => "start",
            WordPooling::End   => "end",
            WordPooling::Sum   => "sum",
            WordPooling::Mean  => "mean",
        };
        f.write_str(name)
    }
}

/// Pick the vector at every position of `positions`.
pub fn gather_positions<B: Backend>(hidden: Tensor<B, 3>, positions: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [batch, _, width] = hidden.dims();
    let [_, words]        = positions.dims();
    let index = positions.reshape([batch, words, 1]).expand([batch, words, width]);
    hidden.gather(1, index)
}

impl WordPooling {
    pub fn pool<B: Backend>(
        &self,
        hidden:    Tensor<B, 3>,
        start_pos: Tensor<B, 2, Int>,
        end_pos:   Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        match self {
            WordPooling::Start => gather_positions(hidden, start_pos),
            WordPooling::End   => gather_positions(hidden, end_pos),
            WordPooling::Sum   => gather_positions(hidden.clone(), start_pos) + gather_positions(hidden, end_pos),
            WordPooling::Mean  => {
                (gather_positions(hidden.clone(), start_pos) + gather_positions(hidden, end_pos)) / 2.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn hidden(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        // one sentence, 4 tokens, width 2: token t = [t, 10 t]
        Tensor::from_data(TensorData::new(vec![0.0f32, 0.0, 1.0, 10.0, 2.0, 20.0, 3.0, 30.0], [1, 4, 2]), device)
    }

    fn pos(values: [i32; 2], device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values.as_slice(), device).reshape([1, 2])
    }

    fn values(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_start_and_end_pick_their_tokens() {
        let device = Default::default();
        let start  = WordPooling::Start.pool(hidden(&device), pos([1, 2], &device), pos([1, 3], &device));
        assert_eq!(values(start), vec![1.0, 10.0, 2.0, 20.0]);
        let end    = WordPooling::End.pool(hidden(&device), pos([1, 2], &device), pos([1, 3], &device));
        assert_eq!(values(end), vec![1.0, 10.0, 3.0, 30.0]);
    }

    #[test]
    fn test_sum_and_mean() {
        let device = Default::default();
        let sum    = WordPooling::Sum.pool(hidden(&device), pos([1, 2], &device), pos([1, 3], &device));
        assert_eq!(values(sum), vec![2.0, 20.0, 5.0, 50.0]);
        let mean   = WordPooling::Mean.pool(hidden(&device), pos([1, 2], &device), pos([1, 3], &device));
        assert_eq!(values(mean), vec![1.0, 10.0, 2.5, 25.0]);
    }

    #[test]
    fn test_parse_pooling() {
        assert_eq!("s+e".parse::<WordPooling>().unwrap(), WordPooling::Sum);
        assert!("max".parse::<WordPooling>().is_err());
    }
}
