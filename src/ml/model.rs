// ============================================================
// Layer 5 — Dependency Model
// ============================================================
// encoder → word pooling → two independent biaffine scorers
//
// The encoder is any `ContextualEncoder`; `ParserModel` is the
// model over the bundled `TokenEncoder`.
//
//   unlabeled [B, L, L]             arc score of dependent d → head h
//   labeled   [B, L, L, num_labels] relation scores of the same pair
//
// Loss (training only):
//
//   loss = (1 - r) · BCE(unlabeled, M > 0) + r · CE(labeled, M)
//
//   BCE runs over every pair of real word slots of annotated
//   sentences, CE only over the cells that hold an arc. The ratio
//   r is either fixed or a trainable scalar starting at 0.5.

use burn::{
    module::{Ignored, Param},
    nn::Initializer,
    prelude::*,
    tensor::activation::log_softmax,
};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::ml::biaffine::{BiaffineConfig, BiaffineScorer, BiaffineVariant};
use crate::ml::encoder::{ContextualEncoder, TokenEncoder, TokenEncoderConfig};
use crate::ml::pooling::WordPooling;

/// Weight of the labeled loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossRatio {
    Fixed(f64),
    /// Trainable scalar initialised at 0.5
    Learned,
}

impl Default for LossRatio {
    fn default() -> Self {
        LossRatio::Fixed(0.5)
    }
}

#[derive(Config, Debug)]
pub struct DependencyModelConfig {
    pub encoder:             TokenEncoderConfig,
    /// Relation vocabulary size, reserved "no arc" entry included
    pub num_labels:          usize,
    #[config(default = "BiaffineVariant::Deep")]
    pub biaffine_variant:    BiaffineVariant,
    #[config(default = 300)]
    pub biaffine_hidden_dim: usize,
    #[config(default = 0.1)]
    pub biaffine_dropout:    f64,
    #[config(default = true)]
    pub pairwise:            bool,
    #[config(default = "WordPooling::Sum")]
    pub pooling:             WordPooling,
    #[config(default = "LossRatio::Fixed(0.5)")]
    pub loss_ratio:          LossRatio,
    #[config(default = "Initializer::Zeros")]
    pub initializer:         Initializer,
}

impl DependencyModelConfig {
    fn scorer(&self, output_dim: usize, width: usize) -> BiaffineConfig {
        BiaffineConfig::new(width, width, output_dim)
            .with_variant(self.biaffine_variant)
            .with_hidden_dim(self.biaffine_hidden_dim)
            .with_dropout(self.biaffine_dropout)
            .with_pairwise(self.pairwise)
            .with_initializer(self.initializer.clone())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.scorer(1, self.encoder.d_model).validate()?;
        if self.num_labels < 2 {
            return Err(PipelineError::invalid_config(
                "num_labels must include the reserved entry and at least one relation",
            ));
        }
        if let LossRatio::Fixed(r) = self.loss_ratio {
            if !(0.0..=1.0).contains(&r) {
                return Err(PipelineError::invalid_config(format!(
                    "label loss ratio {r} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Model over the bundled encoder described by `self.encoder`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ParserModel<B> {
        self.init_with_encoder(self.encoder.init(device), device)
    }

    /// Model over a caller-supplied encoder. The scorers are sized
    /// from `encoder.hidden_size()`, so `self.encoder` is ignored.
    pub fn init_with_encoder<B: Backend, E: ContextualEncoder<B>>(
        &self,
        encoder: E,
        device:  &B::Device,
    ) -> DependencyModel<B, E> {
        let width = encoder.hidden_size();
        let learned_ratio = match self.loss_ratio {
            LossRatio::Learned  => Some(Param::from_tensor(Tensor::from_floats([0.5], device))),
            LossRatio::Fixed(_) => None,
        };
        let fixed_ratio = match self.loss_ratio {
            LossRatio::Fixed(r) => r,
            LossRatio::Learned  => 0.5,
        };
        DependencyModel {
            encoder,
            unlabeled: self.scorer(1, width).init(device),
            labeled:   self.scorer(self.num_labels, width).init(device),
            pooling:   Ignored(self.pooling),
            learned_ratio,
            fixed_ratio,
            num_labels: self.num_labels,
        }
    }
}

#[derive(Module, Debug)]
pub struct DependencyModel<B: Backend, E> {
    pub encoder:       E,
    pub unlabeled:     BiaffineScorer<B>,
    pub labeled:       BiaffineScorer<B>,
    pub pooling:       Ignored<WordPooling>,
    pub learned_ratio: Option<Param<Tensor<B, 1>>>,
    pub fixed_ratio:   f64,
    pub num_labels:    usize,
}

pub type ParserModel<B> = DependencyModel<B, TokenEncoder<B>>;

#[derive(Debug, Clone)]
pub struct DependencyScores<B: Backend> {
    /// `[B, L, L]`
    pub unlabeled: Tensor<B, 3>,
    /// `[B, L, L, num_labels]`
    pub labeled:   Tensor<B, 4>,
}

#[derive(Debug, Clone)]
pub struct DependencyLoss<B: Backend> {
    pub total:     Tensor<B, 1>,
    pub unlabeled: Tensor<B, 1>,
    pub labeled:   Tensor<B, 1>,
}

impl<B: Backend, E: ContextualEncoder<B>> DependencyModel<B, E> {
    pub fn forward(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        segment_ids:    Tensor<B, 2, Int>,
        start_pos:      Tensor<B, 2, Int>,
        end_pos:        Tensor<B, 2, Int>,
    ) -> DependencyScores<B> {
        let hidden = self.encoder.encode(token_ids, attention_mask, segment_ids);
        let words  = self.pooling.0.pool(hidden, start_pos, end_pos);
        DependencyScores {
            unlabeled: self.unlabeled.forward(words.clone(), words.clone()).squeeze::<3>(3),
            labeled:   self.labeled.forward(words.clone(), words),
        }
    }

    /// Current weight of the labeled loss, shape `[1]`.
    pub fn label_loss_ratio(&self, device: &B::Device) -> Tensor<B, 1> {
        match &self.learned_ratio {
            Some(param) => param.val(),
            None        => Tensor::from_floats([self.fixed_ratio as f32], device),
        }
    }

    /// Mixed arc/relation loss against `labels [B, L, L]`.
    /// `word_mask [B, L]` marks real word slots.
    pub fn loss(
        &self,
        scores:    &DependencyScores<B>,
        labels:    Tensor<B, 3, Int>,
        word_mask: Tensor<B, 2, Int>,
    ) -> Result<DependencyLoss<B>, PipelineError> {
        let [batch, len, _] = labels.dims();
        let device = labels.device();

        let slots     = word_mask.float();
        let pair_mask = slots.clone().reshape([batch, len, 1]).expand([batch, len, len])
            * slots.reshape([batch, 1, len]).expand([batch, len, len])
            * labels.clone().greater_equal_elem(0).float();
        let pair_count: f64 = pair_mask.clone().sum().into_scalar().elem::<f64>();
        if pair_count == 0.0 {
            return Err(PipelineError::UnannotatedBatch);
        }

        // BCE with logits: max(z, 0) - z·t + log(1 + e^-|z|)
        let z       = scores.unlabeled.clone();
        let target  = labels.clone().greater_elem(0).float();
        let bce     = z.clone().clamp_min(0.0) - z.clone() * target.clone() + z.abs().neg().exp().log1p();
        let unlabeled = (bce * pair_mask.clone()).sum() / pair_count;

        // CE on arc cells only
        let arc_mask  = target * pair_mask;
        let arc_count = arc_mask.clone().sum().clamp_min(1.0);
        let log_probs = log_softmax(scores.labeled.clone(), 3);
        let gold      = labels.clamp_min(0).reshape([batch, len, len, 1]);
        let picked    = log_probs.gather(3, gold).reshape([batch, len, len]);
        let labeled   = (picked.neg() * arc_mask).sum() / arc_count;

        let ratio = self.label_loss_ratio(&device);
        let total = unlabeled.clone() * (ratio.clone().neg() + 1.0) + labeled.clone() * ratio;
        Ok(DependencyLoss { total, unlabeled, labeled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Embedding, EmbeddingConfig};
    use burn::tensor::TensorData;

    type TestBackend = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn config(loss_ratio: LossRatio) -> DependencyModelConfig {
        DependencyModelConfig::new(TokenEncoderConfig::new(30, 5, 16, 2, 1, 32), 4)
            .with_biaffine_hidden_dim(8)
            .with_loss_ratio(loss_ratio)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 0.1 })
    }

    fn int2<B: Backend>(values: Vec<i32>, device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(values.as_slice(), device).reshape([2, 5])
    }

    fn run<B: Backend, E: ContextualEncoder<B>>(
        model:  &DependencyModel<B, E>,
        device: &B::Device,
    ) -> DependencyScores<B> {
        model.forward(
            int2(vec![2, 5, 11, 12, 3, 2, 5, 13, 3, 0], device),
            int2(vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 0], device),
            int2(vec![0; 10], device),
            int2(vec![1, 2, 3, 4, 4, 1, 2, 4, 4, 4], device),
            int2(vec![1, 2, 3, 4, 4, 1, 2, 4, 4, 4], device),
        )
    }

    fn labels<B: Backend>(device: &B::Device) -> (Tensor<B, 3, Int>, Tensor<B, 2, Int>) {
        // sentence 0: word 1 ← root (rel 3), word 2 ← word 1 (rel 1)
        // sentence 1: unannotated
        let mut cells = vec![0i32; 25];
        cells[5]  = 3;
        cells[11] = 1;
        cells.extend(vec![-1i32; 25]);
        let labels = Tensor::<B, 1, Int>::from_ints(cells.as_slice(), device).reshape([2, 5, 5]);
        let mask   = int2(vec![1, 1, 1, 0, 0, 1, 1, 0, 0, 0], device);
        (labels, mask)
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model  = config(LossRatio::default()).init::<TestBackend>(&device);
        let scores = run(&model, &device);
        assert_eq!(scores.unlabeled.dims(), [2, 5, 5]);
        assert_eq!(scores.labeled.dims(), [2, 5, 5, 4]);
    }

    #[test]
    fn test_direct_variant_shapes() {
        let device = Default::default();
        let model  = config(LossRatio::default())
            .with_biaffine_variant(BiaffineVariant::Direct)
            .init::<TestBackend>(&device);
        let scores = run(&model, &device);
        assert_eq!(scores.unlabeled.dims(), [2, 5, 5]);
        assert_eq!(scores.labeled.dims(), [2, 5, 5, 4]);
    }

    #[test]
    fn test_zero_scores_give_log_two_arc_loss() {
        let device = Default::default();
        let model  = config(LossRatio::Fixed(0.0))
            .with_initializer(Initializer::Zeros)
            .init::<TestBackend>(&device);
        let scores = run(&model, &device);
        let (labels, mask) = labels(&device);
        let loss   = model.loss(&scores, labels, mask).unwrap();
        let value: f64 = loss.total.into_scalar().elem::<f64>();
        assert!((value - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_unannotated_batch_has_no_loss() {
        let device = Default::default();
        let model  = config(LossRatio::default()).init::<TestBackend>(&device);
        let scores = run(&model, &device);
        let labels = Tensor::<TestBackend, 3, Int>::from_data(TensorData::new(vec![-1i64; 50], [2, 5, 5]), &device);
        let mask   = int2(vec![1; 10], &device);
        assert!(matches!(model.loss(&scores, labels, mask), Err(PipelineError::UnannotatedBatch)));
    }

    #[test]
    fn test_learned_ratio_receives_gradient() {
        let device = Default::default();
        let model  = config(LossRatio::Learned).init::<TestAutodiffBackend>(&device);
        assert!(model.learned_ratio.is_some());
        let scores = run(&model, &device);
        let (labels, mask) = labels(&device);
        let loss   = model.loss(&scores, labels, mask).unwrap();
        let grads  = loss.total.backward();
        let ratio  = model.learned_ratio.as_ref().unwrap().val();
        assert!(ratio.grad(&grads).is_some());
    }

    #[derive(Module, Debug)]
    struct LookupEncoder<B: Backend> {
        embedding: Embedding<B>,
        width:     usize,
    }

    impl<B: Backend> ContextualEncoder<B> for LookupEncoder<B> {
        fn hidden_size(&self) -> usize {
            self.width
        }

        fn encode(
            &self,
            token_ids:       Tensor<B, 2, Int>,
            _attention_mask: Tensor<B, 2, Int>,
            _segment_ids:    Tensor<B, 2, Int>,
        ) -> Tensor<B, 3> {
            self.embedding.forward(token_ids)
        }
    }

    fn lookup_encoder<B: Backend>(device: &B::Device) -> LookupEncoder<B> {
        LookupEncoder { embedding: EmbeddingConfig::new(30, 6).init(device), width: 6 }
    }

    #[test]
    fn test_custom_encoder_sizes_the_scorers() {
        let device = Default::default();
        let model  = config(LossRatio::default())
            .init_with_encoder(lookup_encoder::<TestBackend>(&device), &device);
        let scores = run(&model, &device);
        assert_eq!(scores.unlabeled.dims(), [2, 5, 5]);
        assert_eq!(scores.labeled.dims(), [2, 5, 5, 4]);
    }

    #[test]
    fn test_custom_encoder_is_trained_through_the_loss() {
        let device = Default::default();
        let model  = config(LossRatio::default())
            .init_with_encoder(lookup_encoder::<TestAutodiffBackend>(&device), &device);
        let scores = run(&model, &device);
        let (labels, mask) = labels(&device);
        let loss   = model.loss(&scores, labels, mask).unwrap();
        let grads  = loss.total.backward();
        assert!(model.encoder.embedding.weight.val().grad(&grads).is_some());
    }

    #[test]
    fn test_invalid_fixed_ratio_rejected() {
        assert!(config(LossRatio::Fixed(1.5)).validate().is_err());
        assert!(config(LossRatio::Fixed(0.3)).validate().is_ok());
        assert!(config(LossRatio::Learned).with_pairwise(false).validate().is_err());
    }
}
