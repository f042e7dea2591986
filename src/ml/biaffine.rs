// ============================================================
// Layer 5 — Biaffine Scorer
// ============================================================
// Scores every (dependent, head) pair of a sentence:
//
//   dep [B, L, D1], head [B, L, D2] → S [B, L, L, O]
//
//   S[b, i, j, o] = x_i' · W_o · y_j' + bias_o
//   x' = [x, 1], y' = [y, 1]
//
// The appended constant feature folds the linear terms into one
// bilinear form. Two variants:
//
//   deep   → each side first goes through Linear → ReLU → Dropout
//   direct → the bilinear form sees the raw vectors
//
// Weights start at zero unless another initializer is configured.

use std::{fmt, str::FromStr};

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiaffineVariant {
    Deep,
    Direct,
}

impl FromStr for BiaffineVariant {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deep"   => Ok(BiaffineVariant::Deep),
            "direct" => Ok(BiaffineVariant::Direct),
            other    => Err(PipelineError::invalid_config(format!(
                "unknown biaffine variant '{other}' (expected deep or direct)"
            ))),
        }
    }
}

impl fmt::Display for BiaffineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiaffineVariant::Deep   => write!(f, "deep"),
            BiaffineVariant::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Config, Debug)]
pub struct BiaffineConfig {
    pub dep_dim:     usize,
    pub head_dim:    usize,
    pub output_dim:  usize,
    #[config(default = "BiaffineVariant::Deep")]
    pub variant:     BiaffineVariant,
    /// Projection width of the deep variant
    #[config(default = 300)]
    pub hidden_dim:  usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
    /// Score every pair; the only supported mode
    #[config(default = true)]
    pub pairwise:    bool,
    #[config(default = "Initializer::Zeros")]
    pub initializer: Initializer,
}

impl BiaffineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.pairwise {
            return Err(PipelineError::invalid_config(
                "biaffine scoring is pairwise only (pairwise = false is not supported)",
            ));
        }
        if self.output_dim == 0 {
            return Err(PipelineError::invalid_config("biaffine output_dim must be positive"));
        }
        Ok(())
    }

    /// Callers validate first; a non-pairwise config still builds a
    /// pairwise scorer.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiaffineScorer<B> {
        let (dep_proj, head_proj, dep_dim, head_dim) = match self.variant {
            BiaffineVariant::Deep => (
                Some(LinearConfig::new(self.dep_dim, self.hidden_dim).init(device)),
                Some(LinearConfig::new(self.head_dim, self.hidden_dim).init(device)),
                self.hidden_dim,
                self.hidden_dim,
            ),
            BiaffineVariant::Direct => (None, None, self.dep_dim, self.head_dim),
        };
        let bilinear = PairwiseBilinearConfig::new(dep_dim + 1, head_dim + 1, self.output_dim)
            .with_initializer(self.initializer.clone())
            .init(device);
        BiaffineScorer {
            dep_proj,
            head_proj,
            dropout: DropoutConfig::new(self.dropout).init(),
            bilinear,
        }
    }
}

// ─── Pairwise Bilinear ───────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct PairwiseBilinearConfig {
    pub dep_dim:     usize,
    pub head_dim:    usize,
    pub output_dim:  usize,
    #[config(default = "Initializer::Zeros")]
    pub initializer: Initializer,
}

impl PairwiseBilinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PairwiseBilinear<B> {
        let weight = self.initializer.init_with(
            [self.dep_dim, self.output_dim * self.head_dim],
            Some(self.dep_dim),
            Some(self.output_dim * self.head_dim),
            device,
        );
        let bias = Initializer::Zeros.init([self.output_dim], device);
        PairwiseBilinear {
            weight,
            bias,
            output_dim: self.output_dim,
        }
    }
}

/// `S[b,i,j,o] = x_i W_o y_j + bias_o` with no feature augmentation.
#[derive(Module, Debug)]
pub struct PairwiseBilinear<B: Backend> {
    /// `[dep_dim, output_dim * head_dim]`, read as `[dep_dim][o][head_dim]`
    pub weight:     Param<Tensor<B, 2>>,
    pub bias:       Param<Tensor<B, 1>>,
    pub output_dim: usize,
}

impl<B: Backend> PairwiseBilinear<B> {
    pub fn forward(&self, dep: Tensor<B, 3>, head: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, dep_len, dep_dim] = dep.dims();
        let [_, head_len, head_dim]   = head.dims();
        let out = self.output_dim;

        // [(B·L1), D1] × [D1, O·D2] → [B, L1·O, D2]
        let intermediate = dep
            .reshape([batch * dep_len, dep_dim])
            .matmul(self.weight.val())
            .reshape([batch, dep_len * out, head_dim]);
        // [B, L1·O, D2] × [B, D2, L2] → [B, L1, O, L2] → [B, L1, L2, O]
        let scores = intermediate
            .matmul(head.swap_dims(1, 2))
            .reshape([batch, dep_len, out, head_len])
            .swap_dims(2, 3);
        scores + self.bias.val().reshape([1, 1, 1, out])
    }
}

// ─── Biaffine Scorer ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BiaffineScorer<B: Backend> {
    pub dep_proj:  Option<Linear<B>>,
    pub head_proj: Option<Linear<B>>,
    pub dropout:   Dropout,
    pub bilinear:  PairwiseBilinear<B>,
}

fn append_ones<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, len, _] = x.dims();
    let ones = Tensor::ones([batch, len, 1], &x.device());
    Tensor::cat(vec![x, ones], 2)
}

impl<B: Backend> BiaffineScorer<B> {
    fn project(&self, proj: &Option<Linear<B>>, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match proj {
            Some(linear) => self.dropout.forward(relu(linear.forward(x))),
            None         => x,
        }
    }

    /// `dep [B, L1, D1]`, `head [B, L2, D2]` → `[B, L1, L2, O]`
    pub fn forward(&self, dep: Tensor<B, 3>, head: Tensor<B, 3>) -> Tensor<B, 4> {
        let dep  = append_ones(self.project(&self.dep_proj, dep));
        let head = append_ones(self.project(&self.head_proj, head));
        self.bilinear.forward(dep, head)
    }

    pub fn output_dim(&self) -> usize {
        self.bilinear.output_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray;

    fn words(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        Tensor::random([2, 5, 8], Distribution::Normal(0.0, 1.0), device)
    }

    #[test]
    fn test_deep_shapes() {
        let device = Default::default();
        let x      = words(&device);
        let unlabeled = BiaffineConfig::new(8, 8, 1).with_hidden_dim(6).init::<TestBackend>(&device);
        let labeled   = BiaffineConfig::new(8, 8, 7).with_hidden_dim(6).init::<TestBackend>(&device);
        let u = unlabeled.forward(x.clone(), x.clone());
        assert_eq!(u.dims(), [2, 5, 5, 1]);
        assert_eq!(u.squeeze::<3>(3).dims(), [2, 5, 5]);
        assert_eq!(labeled.forward(x.clone(), x).dims(), [2, 5, 5, 7]);
    }

    #[test]
    fn test_direct_shapes() {
        let device = Default::default();
        let x      = words(&device);
        let scorer = BiaffineConfig::new(8, 8, 4)
            .with_variant(BiaffineVariant::Direct)
            .init::<TestBackend>(&device);
        assert!(scorer.dep_proj.is_none());
        assert_eq!(scorer.forward(x.clone(), x).dims(), [2, 5, 5, 4]);
    }

    #[test]
    fn test_zero_init_scores_zero() {
        let device = Default::default();
        let x      = words(&device);
        let scorer = BiaffineConfig::new(8, 8, 3)
            .with_variant(BiaffineVariant::Direct)
            .init::<TestBackend>(&device);
        let values = scorer.forward(x.clone(), x).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bilinear_plus_linear_by_hand() {
        let device = Default::default();
        // W = [[1, 2], [3, 4]] over x' = [x, 1], y' = [y, 1]; bias 0.5
        let bilinear = PairwiseBilinear::<TestBackend> {
            weight:     Param::from_tensor(Tensor::from_data(TensorData::new(vec![1.0f32, 2.0, 3.0, 4.0], [2, 2]), &device)),
            bias:       Param::from_tensor(Tensor::from_data(TensorData::new(vec![0.5f32], [1]), &device)),
            output_dim: 1,
        };
        let scorer = BiaffineScorer {
            dep_proj:  None,
            head_proj: None,
            dropout:   DropoutConfig::new(0.0).init(),
            bilinear,
        };
        let dep  = Tensor::from_data(TensorData::new(vec![2.0f32], [1, 1, 1]), &device);
        let head = Tensor::from_data(TensorData::new(vec![3.0f32], [1, 1, 1]), &device);
        let s    = scorer.forward(dep, head).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        // [2, 1] · W · [3, 1] = [5, 8] · [3, 1] = 23, plus 0.5
        assert_eq!(s, vec![23.5]);
    }

    #[test]
    fn test_pairwise_false_rejected() {
        assert!(BiaffineConfig::new(8, 8, 1).with_pairwise(false).validate().is_err());
        assert!(BiaffineConfig::new(8, 8, 1).validate().is_ok());
    }
}
