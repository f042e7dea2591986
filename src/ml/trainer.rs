// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + dev loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend (Autodiff<Wgpu> in the CLI)
//   - model.valid() returns the model on B::InnerBackend, so the
//     dev loader is built for the inner backend too
//   - Batches whose sentences are all unannotated have no loss
//     and are skipped
//   - With a dev split, the best epoch is recorded and training
//     stops after `early_stop_epochs` epochs without improvement
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{build_loader, BatchOrder},
    dataset::DependencyDataset,
};
use crate::error::PipelineError;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::encoder::ContextualEncoder;
use crate::ml::model::{DependencyLoss, DependencyModel, DependencyModelConfig, ParserModel};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub epochs_run:    usize,
    pub best_epoch:    Option<usize>,
    pub best_dev_loss: f64,
}

pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &DependencyModelConfig,
    train_dataset: DependencyDataset,
    dev_dataset:   Option<DependencyDataset>,
    ckpt_manager:  CheckpointManager,
    metrics:       MetricsLogger,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<TrainBackend>(
        cfg, model_cfg, train_dataset, dev_dataset, &ckpt_manager, &metrics, device,
    )
}

/// Dev-split averages of the three loss terms.
struct DevLoss {
    total:     f64,
    unlabeled: f64,
    labeled:   f64,
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &DependencyModelConfig,
    train_dataset: DependencyDataset,
    dev_dataset:   Option<DependencyDataset>,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainSummary> {

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: ParserModel<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} encoder layers, d_model={}, {} relation ids, {} biaffine",
        model_cfg.encoder.num_layers,
        model_cfg.encoder.d_model,
        model_cfg.num_labels,
        model_cfg.biaffine_variant,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    tracing::info!(
        "Training on {} features ({} annotated)",
        train_dataset.feature_count(),
        train_dataset.annotated_count(),
    );
    let train_loader = build_loader::<B>(
        train_dataset, device.clone(), cfg.batch_size, BatchOrder::Shuffled { seed: cfg.seed },
    );
    let dev_loader = dev_dataset.map(|dev| {
        build_loader::<B::InnerBackend>(dev, device.clone(), cfg.batch_size, BatchOrder::Sequential)
    });

    let mut best_dev_loss = f64::NAN;
    let mut best_epoch    = None;
    let mut stale_epochs  = 0usize;
    let mut epochs_run    = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut skipped        = 0usize;

        for batch in train_loader.iter() {
            let scores = model.forward(
                batch.token_ids,
                batch.attention_mask,
                batch.segment_ids,
                batch.start_pos,
                batch.end_pos,
            );
            let loss = match model.loss(&scores, batch.labels, batch.word_mask) {
                Ok(loss) => loss.total,
                Err(PipelineError::UnannotatedBatch) => {
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            train_loss_sum += scalar(loss.clone());
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        if skipped > 0 {
            tracing::warn!("Epoch {}: skipped {} unannotated batches", epoch, skipped);
        }
        anyhow::ensure!(train_batches > 0, "no annotated training batch to learn from");
        let avg_train_loss = train_loss_sum / train_batches as f64;

        // ── Dev phase ─────────────────────────────────────────────────────────
        // model.valid() → ParserModel<B::InnerBackend>, dropout off
        let mut epoch_metrics = EpochMetrics::new(epoch, avg_train_loss);
        epoch_metrics.label_loss_ratio = scalar(model.label_loss_ratio(&device));

        if let Some(dev_loader) = &dev_loader {
            let model_valid = model.valid();
            if let Some(dev) = evaluate(&model_valid, dev_loader.iter())? {
                epoch_metrics.dev_loss   = dev.total;
                epoch_metrics.arc_loss   = dev.unlabeled;
                epoch_metrics.label_loss = dev.labeled;
            }
        }

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | dev_loss={:.4} | arc_loss={:.4} | label_loss={:.4} | ratio={:.3}",
            epoch, cfg.epochs, avg_train_loss, epoch_metrics.dev_loss,
            epoch_metrics.arc_loss, epoch_metrics.label_loss, epoch_metrics.label_loss_ratio,
        );

        ckpt_manager.save_model(&model, epoch)?;
        metrics.log(&epoch_metrics)?;
        epochs_run = epoch;

        if epoch_metrics.is_improvement(best_dev_loss) {
            best_dev_loss = epoch_metrics.dev_loss;
            best_epoch    = Some(epoch);
            stale_epochs  = 0;
            ckpt_manager.mark_best(epoch)?;
            tracing::info!("New best dev loss {:.4} at epoch {}", best_dev_loss, epoch);
        } else if !epoch_metrics.dev_loss.is_nan() {
            stale_epochs += 1;
            if cfg.early_stop_epochs.is_some_and(|patience| stale_epochs >= patience) {
                tracing::info!(
                    "No dev improvement for {} epochs, stopping after epoch {}",
                    stale_epochs, epoch
                );
                break;
            }
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary { epochs_run, best_epoch, best_dev_loss })
}

/// Average dev losses over the annotated batches; `None` when the
/// dev split has no annotated batch.
fn evaluate<B: Backend, E: ContextualEncoder<B>>(
    model:   &DependencyModel<B, E>,
    batches: impl Iterator<Item = crate::data::batcher::DependencyBatch<B>>,
) -> Result<Option<DevLoss>> {
    let mut sum     = DevLoss { total: 0.0, unlabeled: 0.0, labeled: 0.0 };
    let mut batches_seen = 0usize;

    for batch in batches {
        let scores = model.forward(
            batch.token_ids,
            batch.attention_mask,
            batch.segment_ids,
            batch.start_pos,
            batch.end_pos,
        );
        let DependencyLoss { total, unlabeled, labeled } =
            match model.loss(&scores, batch.labels, batch.word_mask) {
                Ok(loss) => loss,
                Err(PipelineError::UnannotatedBatch) => continue,
                Err(e) => return Err(e.into()),
            };
        sum.total     += scalar(total);
        sum.unlabeled += scalar(unlabeled);
        sum.labeled   += scalar(labeled);
        batches_seen  += 1;
    }

    if batches_seen == 0 {
        return Ok(None);
    }
    let n = batches_seen as f64;
    Ok(Some(DevLoss {
        total:     sum.total / n,
        unlabeled: sum.unlabeled / n,
        labeled:   sum.labeled / n,
    }))
}
