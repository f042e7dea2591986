// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `convert`, `train` and `score`
// and all their configurable flags. Input-pipeline flags are
// shared by `convert` and `train` through `InputArgs`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    convert_use_case::ConvertConfig,
    score_use_case::ScoreConfig,
    train_use_case::TrainConfig,
};
use crate::data::{
    alignment::RootRepresentation,
    context::InputConfig,
    corruption::MaskGranularity,
    layout::EncoderFamily,
};
use crate::infra::checkpoint::CheckpointChoice;
use crate::ml::{
    biaffine::BiaffineVariant,
    encoder::EncoderOutput,
    model::LossRatio,
    pooling::WordPooling,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the feature pipeline over a corpus and report skips
    Convert(ConvertArgs),

    /// Train the parser on a CoNLL-U corpus
    Train(TrainArgs),

    /// Write score grids for a corpus using a trained checkpoint
    Score(ScoreArgs),
}

/// How sentences become encoder input.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Token budget per sequence, boundary tokens included
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Root word: boundary-token (cls), placeholder (unused),
    /// or literal(<marker>) (root, 根)
    #[arg(long, default_value = "placeholder")]
    pub root_representation: RootRepresentation,

    /// Encoder family deciding boundary tokens and padding side
    #[arg(long, default_value = "bert")]
    pub encoder_family: EncoderFamily,

    /// Hard-truncate over-long sentences instead of skipping them
    #[arg(long)]
    pub truncate_long_input: bool,

    /// Corrupt training input by masking
    #[arg(long)]
    pub input_mask: bool,

    /// Mask whole words or single characters
    #[arg(long, default_value = "char")]
    pub input_mask_granularity: MaskGranularity,

    #[arg(long, default_value_t = 0.1)]
    pub input_mask_prob: f64,

    /// Joins words into the text given to the tokenizer
    #[arg(long, default_value = " ")]
    pub word_separator: String,
}

impl From<InputArgs> for InputConfig {
    fn from(a: InputArgs) -> Self {
        InputConfig {
            max_seq_len:            a.max_seq_len,
            root_representation:    a.root_representation,
            encoder_family:         a.encoder_family,
            layout_override:        None,
            skip_too_long_input:    !a.truncate_long_input,
            input_mask:             a.input_mask,
            input_mask_granularity: a.input_mask_granularity,
            input_mask_prob:        a.input_mask_prob,
            word_separator:         a.word_separator,
        }
    }
}

/// All arguments for the `convert` command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// CoNLL-U corpus to convert
    #[arg(long)]
    pub corpus: String,

    /// Relation labels, one per line
    #[arg(long, default_value = "data/graph_vocab.txt")]
    pub vocab_file: String,

    /// tokenizer.json of the encoder
    #[arg(long, default_value = "checkpoints/tokenizer.json")]
    pub tokenizer_file: String,

    /// Prefix of the example ids
    #[arg(long, default_value = "train")]
    pub split: String,

    /// Apply input corruption as during training
    #[arg(long)]
    pub training: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the features as JSON lines
    #[arg(long)]
    pub output: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

impl From<ConvertArgs> for ConvertConfig {
    fn from(a: ConvertArgs) -> Self {
        ConvertConfig {
            corpus_file:    a.corpus,
            vocab_file:     a.vocab_file,
            tokenizer_file: a.tokenizer_file,
            split:          a.split,
            training:       a.training,
            seed:           a.seed,
            input:          a.input.into(),
            output_file:    a.output,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training corpus (CoNLL-U)
    #[arg(long, default_value = "data/train.conllu")]
    pub train_file: String,

    /// Dev corpus; without one, part of train is held out
    #[arg(long)]
    pub dev_file: Option<String>,

    /// Share of train held out when no dev corpus is given
    #[arg(long, default_value_t = 0.1)]
    pub dev_fraction: f64,

    /// Relation labels, one per line
    #[arg(long, default_value = "data/graph_vocab.txt")]
    pub vocab_file: String,

    /// Existing tokenizer.json; otherwise one is built from the corpus
    #[arg(long)]
    pub tokenizer_file: Option<String>,

    /// Entry cap of a built tokenizer
    #[arg(long, default_value_t = 30000)]
    pub max_vocab: usize,

    /// Directory for checkpoints, tokenizer, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Stop after this many epochs without dev improvement
    #[arg(long)]
    pub early_stop_epochs: Option<usize>,

    /// Hidden dimension of the encoder
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Encoder output: last or last-four-sum
    #[arg(long, default_value = "last")]
    pub encoder_output: EncoderOutput,

    /// Word vector from its tokens: s, e, s+e (sum) or mean
    #[arg(long, default_value = "s+e")]
    pub pooling: WordPooling,

    /// deep (projected) or direct biaffine
    #[arg(long, default_value = "deep")]
    pub biaffine_variant: BiaffineVariant,

    #[arg(long, default_value_t = 300)]
    pub biaffine_hidden_dim: usize,

    #[arg(long, default_value_t = 0.1)]
    pub biaffine_dropout: f64,

    /// Weight of the labeled loss
    #[arg(long, default_value_t = 0.5)]
    pub label_loss_ratio: f64,

    /// Learn the labeled-loss weight instead
    #[arg(long)]
    pub learn_loss_ratio: bool,

    #[command(flatten)]
    pub input: InputArgs,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let loss_ratio = if a.learn_loss_ratio {
            LossRatio::Learned
        } else {
            LossRatio::Fixed(a.label_loss_ratio)
        };
        TrainConfig {
            train_file:          a.train_file,
            dev_file:            a.dev_file,
            dev_fraction:        a.dev_fraction,
            vocab_file:          a.vocab_file,
            tokenizer_file:      a.tokenizer_file,
            max_vocab:           a.max_vocab,
            checkpoint_dir:      a.checkpoint_dir,
            input:               a.input.into(),
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            lr:                  a.lr,
            seed:                a.seed,
            early_stop_epochs:   a.early_stop_epochs,
            d_model:             a.d_model,
            num_heads:           a.num_heads,
            num_layers:          a.num_layers,
            d_ff:                a.d_ff,
            dropout:             a.dropout,
            encoder_output:      a.encoder_output,
            pooling:             a.pooling,
            biaffine_variant:    a.biaffine_variant,
            biaffine_hidden_dim: a.biaffine_hidden_dim,
            biaffine_dropout:    a.biaffine_dropout,
            loss_ratio,
            vocab_size:          0,
        }
    }
}

/// All arguments for the `score` command
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// CoNLL-U corpus to score
    #[arg(long)]
    pub corpus: String,

    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// latest, best, or an epoch number
    #[arg(long, default_value = "best")]
    pub checkpoint: CheckpointChoice,

    /// JSON-lines output file
    #[arg(long, default_value = "scores.jsonl")]
    pub output: String,

    /// Prefix of the sentence ids
    #[arg(long, default_value = "test")]
    pub split: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,
}

impl From<ScoreArgs> for ScoreConfig {
    fn from(a: ScoreArgs) -> Self {
        ScoreConfig {
            corpus_file:    a.corpus,
            checkpoint_dir: a.checkpoint_dir,
            checkpoint:     a.checkpoint,
            output_file:    a.output,
            split:          a.split,
            batch_size:     a.batch_size,
        }
    }
}
