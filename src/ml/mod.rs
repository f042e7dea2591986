// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model code lives here. The data layer only produces
// integer tensors (batcher.rs); everything that learns or
// scores is in this layer.
//
//   encoder.rs  — contextual token encoder behind the
//                 ContextualEncoder trait (embeddings, self-
//                 attention blocks, last or last-four-sum output)
//
//   pooling.rs  — token vectors → word vectors by gathering the
//                 start / end token positions of each word slot
//
//   biaffine.rs — pairwise bilinear scoring of every
//                 (dependent, head) pair, deep or direct variant
//
//   model.rs    — encoder → pooling → unlabeled + labeled
//                 scorers, and the mixed arc/relation loss
//
//   trainer.rs  — Adam training loop with dev evaluation,
//                 checkpointing and early stopping
//
//   scorer.rs   — loads a checkpoint and produces per-sentence
//                 score grids
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Dozat & Manning (2017) Deep Biaffine Attention

/// Contextual token encoder
pub mod encoder;

/// Token-to-word pooling
pub mod pooling;

/// Pairwise biaffine scorer
pub mod biaffine;

/// Dependency model and loss
pub mod model;

/// Training loop with dev evaluation and checkpointing
pub mod trainer;

/// Checkpoint loading and score-grid production
pub mod scorer;
