// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-backed concerns shared by the use cases:
//
//   checkpoint.rs      — model weights (CompactRecorder), epoch
//                        pointers, TrainConfig JSON and the graph
//                        vocabulary next to the weights
//
//   tokenizer_store.rs — loads tokenizer.json or builds a
//                        word-level one from the training corpus;
//                        adapts tokenizers::Tokenizer to the
//                        SubwordTokenizer trait
//
//   metrics.rs         — per-epoch CSV log

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
