// ============================================================
// Layer 5 — Scorer
// ============================================================
// Runs a trained model over converted features and returns the
// raw score grids of each sentence, cropped to its real word
// slots (root included). No head selection or label decoding
// happens here.
use anyhow::Result;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{build_loader, BatchOrder, DependencyBatch},
    dataset::DependencyDataset,
};
use crate::infra::checkpoint::{CheckpointChoice, CheckpointManager};
use crate::ml::model::ParserModel;

/// Score grids of one sentence, indexed `[dependent][head]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceScores {
    pub id:         String,
    pub word_count: usize,
    /// Arc logits, `word_count × word_count`
    pub unlabeled:  Vec<Vec<f32>>,
    /// Relation logits, `word_count × word_count × num_labels`
    pub labeled:    Vec<Vec<Vec<f32>>>,
}

pub struct Scorer<B: Backend> {
    model:  ParserModel<B>,
    device: B::Device,
}

impl<B: Backend> Scorer<B> {
    pub fn new(model: ParserModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Rebuild the trained model from the config, vocabulary and
    /// weights stored in a checkpoint directory.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        choice:       CheckpointChoice,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg       = ckpt_manager.load_config()?;
        let vocab     = ckpt_manager.load_vocab()?;
        let model_cfg = cfg.model_config(vocab.len());
        let model     = ckpt_manager.load_model(model_cfg.init::<B>(&device), choice, &device)?;
        tracing::info!("Model loaded from checkpoint '{}'", ckpt_manager.dir().display());
        Ok(Self::new(model, device))
    }

    /// Score a whole split, in corpus order.
    pub fn score_dataset(&self, dataset: DependencyDataset, batch_size: usize) -> Result<Vec<SentenceScores>> {
        let loader = build_loader::<B>(dataset, self.device.clone(), batch_size, BatchOrder::Sequential);
        let mut scored = Vec::new();
        for batch in loader.iter() {
            scored.extend(self.score_batch(batch)?);
        }
        Ok(scored)
    }

    pub fn score_batch(&self, batch: DependencyBatch<B>) -> Result<Vec<SentenceScores>> {
        let [_, len] = batch.token_ids.dims();
        let scores = self.model.forward(
            batch.token_ids,
            batch.attention_mask,
            batch.segment_ids,
            batch.start_pos,
            batch.end_pos,
        );
        let num_labels = scores.labeled.dims()[3];

        let unlabeled: Vec<f32> = scores
            .unlabeled
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read arc scores: {e:?}"))?;
        let labeled: Vec<f32> = scores
            .labeled
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read relation scores: {e:?}"))?;

        let sentences = batch
            .ids
            .into_iter()
            .zip(batch.word_counts)
            .enumerate()
            .map(|(b, (id, word_count))| {
                let n = word_count.min(len);
                let cell = |d: usize, h: usize| (b * len + d) * len + h;
                SentenceScores {
                    id,
                    word_count: n,
                    unlabeled: (0..n)
                        .map(|d| (0..n).map(|h| unlabeled[cell(d, h)]).collect())
                        .collect(),
                    labeled: (0..n)
                        .map(|d| {
                            (0..n)
                                .map(|h| {
                                    let at = cell(d, h) * num_labels;
                                    labeled[at..at + num_labels].to_vec()
                                })
                                .collect()
                        })
                        .collect(),
                }
            })
            .collect();
        Ok(sentences)
    }
}
