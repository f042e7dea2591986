// ============================================================
// Layer 5 — Contextual Encoder
// ============================================================
// (token ids, attention mask, segment ids) → per-token vectors
//
// `ContextualEncoder` is the boundary the dependency model sees;
// the model is generic over it. `TokenEncoder` is the bundled
// implementation: a BERT-style transformer with token, position
// and segment embeddings, padding masked out of self-attention.
//
// Output modes:
//   last          → final layer (after the closing LayerNorm)
//   last-four-sum → sum of the last four layer outputs

use std::{fmt, str::FromStr};

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Any trainable module that turns a token batch into contextual
/// vectors.
pub trait ContextualEncoder<B: Backend>: Module<B> {
    /// Width of the vectors `encode` returns.
    fn hidden_size(&self) -> usize;

    /// `[B, L]` inputs → `[B, L, hidden_size]`
    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        segment_ids:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 3>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncoderOutput {
    Last,
    LastFourSum,
}

impl FromStr for EncoderOutput {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last"                            => Ok(EncoderOutput::Last),
            "last-four-sum" | "last_four_sum" => Ok(EncoderOutput::LastFourSum),
            other => Err(PipelineError::invalid_config(format!(
                "unknown encoder output mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EncoderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderOutput::Last        => write!(f, "last"),
            EncoderOutput::LastFourSum => write!(f, "last-four-sum"),
        }
    }
}

#[derive(Config, Debug)]
pub struct TokenEncoderConfig {
    pub vocab_size:      usize,
    pub max_seq_len:     usize,
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    #[config(default = 0.1)]
    pub dropout:         f64,
    /// Segment ids go up to 4 (XLNet padding)
    #[config(default = 5)]
    pub type_vocab_size: usize,
    #[config(default = "EncoderOutput::Last")]
    pub output:          EncoderOutput,
}

impl TokenEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TokenEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let segment_embedding  = EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TokenEncoder {
            token_embedding, position_embedding, segment_embedding,
            layers, final_norm, dropout,
            d_model:       self.d_model,
            last_four_sum: self.output == EncoderOutput::LastFourSum,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask`: true on padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input       = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TokenEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub segment_embedding:  Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
    pub d_model:            usize,
    pub last_four_sum:      bool,
}

impl<B: Backend> ContextualEncoder<B> for TokenEncoder<B> {
    fn hidden_size(&self) -> usize {
        self.d_model
    }

    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        segment_ids:    Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = token_ids.dims();
        let device = token_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let embedded = self.token_embedding.forward(token_ids)
            + self.position_embedding.forward(positions)
            + self.segment_embedding.forward(segment_ids);

        let pad_mask = attention_mask.equal_elem(0);
        let mut x    = self.dropout.forward(embedded);
        let mut outputs: Vec<Tensor<B, 3>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
            outputs.push(x.clone());
        }

        if self.last_four_sum && !outputs.is_empty() {
            let from = outputs.len().saturating_sub(4);
            let mut summed = outputs[from].clone();
            for layer_out in outputs.iter().skip(from + 1) {
                summed = summed + layer_out.clone();
            }
            return summed;
        }
        self.final_norm.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inputs(device: &<TestBackend as Backend>::Device) -> [Tensor<TestBackend, 2, Int>; 3] {
        let ids  = Tensor::<TestBackend, 1, Int>::from_ints([2, 7, 8, 3, 0, 0, 5, 6, 3, 0, 0, 0].as_slice(), device)
            .reshape([2, 6]);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0].as_slice(), device)
            .reshape([2, 6]);
        let segs = Tensor::<TestBackend, 2, Int>::zeros([2, 6], device);
        [ids, mask, segs]
    }

    #[test]
    fn test_output_shape() {
        let device  = Default::default();
        let encoder = TokenEncoderConfig::new(20, 6, 16, 2, 2, 32).init::<TestBackend>(&device);
        let [ids, mask, segs] = inputs(&device);
        assert_eq!(encoder.encode(ids, mask, segs).dims(), [2, 6, 16]);
        assert_eq!(encoder.hidden_size(), 16);
    }

    #[test]
    fn test_last_four_sum_shape() {
        let device  = Default::default();
        let encoder = TokenEncoderConfig::new(20, 6, 8, 2, 5, 16)
            .with_output(EncoderOutput::LastFourSum)
            .init::<TestBackend>(&device);
        let [ids, mask, segs] = inputs(&device);
        assert_eq!(encoder.encode(ids, mask, segs).dims(), [2, 6, 8]);
    }

    #[test]
    fn test_parse_output_mode() {
        assert_eq!("last_four_sum".parse::<EncoderOutput>().unwrap(), EncoderOutput::LastFourSum);
        assert!("first".parse::<EncoderOutput>().is_err());
    }
}
