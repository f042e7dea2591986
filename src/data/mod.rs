// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from CoNLL-U text to tensor batches:
//
//   CoNLL-U file
//       │
//       ▼
//   ConlluReader      → (word, arc-spec) rows per sentence
//       │
//       ▼
//   ExampleBuilder    → arcs resolved, root prepended, corrupted,
//       │               word positions aligned
//       ▼
//   FeatureConverter  → fixed-length arrays + label matrix
//       │
//       ▼
//   DependencyDataset → implements Burn's Dataset trait
//       │
//       ▼
//   DependencyBatcher → stacks features into tensor batches
//
// `PipelineContext` carries the read-only state every step needs.

/// CoNLL-U reader (FORM + DEPS columns)
pub mod conllu;

/// Word → sub-word span alignment and root policies
pub mod alignment;

/// Training-time input masking
pub mod corruption;

/// Pipeline configuration and shared read-only context
pub mod context;

/// Arc-spec parsing and example construction
pub mod example;

/// Encoder layout table (boundary tokens, padding, segments)
pub mod layout;

/// Dense dependency target matrices
pub mod label_matrix;

/// Example → fixed-length feature conversion
pub mod features;

/// Implements Burn's Dataset trait for features
pub mod dataset;

/// Implements Burn's Batcher trait and builds data loaders
pub mod batcher;

/// Dev split hold-out
pub mod splitter;

#[cfg(test)]
pub(crate) mod testing;
