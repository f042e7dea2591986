// ============================================================
// Layer 4 — Dependency Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<Feature> into
// tensors:
//
//   token_ids / attention_mask / segment_ids   [N, L]
//   start_pos / end_pos / word_mask            [N, L]
//   labels                                     [N, L, L]
//
// Every feature is already padded to max_seq_len, so stacking is
// a flatten + reshape.
//
// Batch order is part of the contract: training batches are
// shuffled with a seed, evaluation and scoring batches keep
// corpus order.

use std::sync::Arc;

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::dataset::DependencyDataset;
use crate::data::features::Feature;

// ─── DependencyBatch ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DependencyBatch<B: Backend> {
    pub token_ids:      Tensor<B, 2, Int>,
    /// 1 = real or boundary token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
    pub segment_ids:    Tensor<B, 2, Int>,
    pub start_pos:      Tensor<B, 2, Int>,
    pub end_pos:        Tensor<B, 2, Int>,
    /// 1 on real word slots (root included), 0 on padded slots
    pub word_mask:      Tensor<B, 2, Int>,
    /// Relation id per (dependent, head); -1 for unannotated sentences
    pub labels:         Tensor<B, 3, Int>,
    /// Example ids, in batch order
    pub ids:            Vec<String>,
    /// Real word slots per example
    pub word_counts:    Vec<usize>,
}

// ─── DependencyBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct DependencyBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DependencyBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack<const D: usize>(&self, flat: Vec<i32>, shape: [usize; D]) -> Tensor<B, D, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape(shape)
    }
}

fn flatten<T: Copy>(items: &[Feature], field: impl Fn(&Feature) -> &[T], cast: impl Fn(T) -> i32) -> Vec<i32> {
    items
        .iter()
        .flat_map(|f| field(f).iter().map(|&x| cast(x)))
        .collect()
}

impl<B: Backend> Batcher<Feature, DependencyBatch<B>> for DependencyBatcher<B> {
    fn batch(&self, items: Vec<Feature>) -> DependencyBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |f| f.token_ids.len());

        let token_ids      = flatten(&items, |f| f.token_ids.as_slice(), |x| x as i32);
        let attention_mask = flatten(&items, |f| f.attention_mask.as_slice(), |x| x as i32);
        let segment_ids    = flatten(&items, |f| f.segment_ids.as_slice(), |x| x as i32);
        let start_pos      = flatten(&items, |f| f.start_pos.as_slice(), |x| x as i32);
        let end_pos        = flatten(&items, |f| f.end_pos.as_slice(), |x| x as i32);
        let labels         = flatten(&items, |f| f.labels.as_slice(), |x| x as i32);
        let word_mask: Vec<i32> = items
            .iter()
            .flat_map(|f| (0..seq_len).map(move |slot| i32::from(slot < f.word_count)))
            .collect();

        DependencyBatch {
            token_ids:      self.stack(token_ids, [batch_size, seq_len]),
            attention_mask: self.stack(attention_mask, [batch_size, seq_len]),
            segment_ids:    self.stack(segment_ids, [batch_size, seq_len]),
            start_pos:      self.stack(start_pos, [batch_size, seq_len]),
            end_pos:        self.stack(end_pos, [batch_size, seq_len]),
            word_mask:      self.stack(word_mask, [batch_size, seq_len]),
            labels:         self.stack(labels, [batch_size, seq_len, seq_len]),
            ids:            items.iter().map(|f| f.id.clone()).collect(),
            word_counts:    items.iter().map(|f| f.word_count).collect(),
        }
    }
}

// ─── Loader ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrder {
    /// Training: reshuffled every epoch from `seed`
    Shuffled { seed: u64 },
    /// Evaluation and scoring: corpus order
    Sequential,
}

pub fn build_loader<B: Backend>(
    dataset:    DependencyDataset,
    device:     B::Device,
    batch_size: usize,
    order:      BatchOrder,
) -> Arc<dyn DataLoader<DependencyBatch<B>>> {
    let builder = DataLoaderBuilder::new(DependencyBatcher::<B>::new(device))
        .batch_size(batch_size)
        .num_workers(1);
    match order {
        BatchOrder::Shuffled { seed } => builder.shuffle(seed).build(dataset),
        BatchOrder::Sequential        => builder.build(dataset),
    }
}
