// ============================================================
// Pipeline Error Types
// ============================================================
// Every failure the feature pipeline can raise. Each variant
// names the offending example id (or corpus line) so an abort
// points straight at the input that caused it.
//
// Over-length sentences are NOT errors: they are skipped or
// truncated by the feature converter and only counted.

use thiserror::Error;

/// Result type for the data pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A corpus row that cannot be interpreted (bad arc-spec, `_` after arcs, ...).
    #[error("{example}: malformed row {row}: {reason}")]
    MalformedRow {
        example: String,
        row:     usize,
        reason:  String,
    },

    /// Relation label missing from the graph vocabulary.
    #[error("{example}: unknown relation label '{label}'")]
    UnknownLabel { example: String, label: String },

    #[error("unknown root representation '{0}' (expected boundary-token, placeholder or literal)")]
    UnknownRootRepresentation(String),

    #[error("{example}: start_pos has {start} entries but end_pos has {end}")]
    PositionLengthMismatch {
        example: String,
        start:   usize,
        end:     usize,
    },

    #[error("{example}: {field} has length {actual}, expected {expected}")]
    FeatureLength {
        example:  String,
        field:    &'static str,
        actual:   usize,
        expected: usize,
    },

    #[error("{example}: {tokens} content tokens exceed the budget of {budget}")]
    TokenBudget {
        example: String,
        tokens:  usize,
        budget:  usize,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("CoNLL-U line {line}: {reason}")]
    Conllu { line: usize, reason: String },

    #[error("graph vocabulary: {0}")]
    Vocab(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A loss was requested for a batch without a single annotated word pair.
    #[error("batch has no annotated word pairs to compute a loss on")]
    UnannotatedBatch,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn malformed(example: &str, row: usize, reason: impl Into<String>) -> Self {
        PipelineError::MalformedRow {
            example: example.to_string(),
            row,
            reason: reason.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        PipelineError::InvalidConfig(msg.into())
    }
}
