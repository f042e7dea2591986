// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   1. `convert` — dry run of the feature pipeline
//   2. `train`   — trains the parser and writes checkpoints
//   3. `score`   — loads a checkpoint and writes score grids
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ConvertArgs, ScoreArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "biaffine-parser",
    version = "0.1.0",
    about = "Train a biaffine semantic dependency parser on CoNLL-U corpora and score sentences."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case of the subcommand.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Convert(args) => Self::run_convert(args),
            Commands::Train(args)   => Self::run_train(args),
            Commands::Score(args)   => Self::run_score(args),
        }
    }

    fn run_convert(args: ConvertArgs) -> Result<()> {
        use crate::application::convert_use_case::ConvertUseCase;

        tracing::info!("Converting corpus: {}", args.corpus);
        let report = ConvertUseCase::new(args.into()).execute()?;
        println!(
            "Converted {}/{} sentences ({} skipped as too long).",
            report.converted, report.total, report.skipped
        );
        Ok(())
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on corpus: {}", args.train_file);
        let checkpoint_dir = args.checkpoint_dir.clone();
        TrainUseCase::new(args.into()).execute()?;

        println!("Training complete. Checkpoints saved to '{checkpoint_dir}'.");
        Ok(())
    }

    fn run_score(args: ScoreArgs) -> Result<()> {
        use crate::application::score_use_case::ScoreUseCase;

        let output  = args.output.clone();
        let written = ScoreUseCase::new(args.into()).execute()?;
        println!("Scored {written} sentences into '{output}'.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::data::alignment::RootRepresentation;
    use crate::infra::checkpoint::CheckpointChoice;
    use crate::ml::{model::LossRatio, pooling::WordPooling};

    #[test]
    fn test_train_args_map_to_config() {
        let cli = Cli::try_parse_from([
            "biaffine-parser", "train",
            "--train-file", "train.conllu",
            "--root-representation", "cls",
            "--truncate-long-input",
            "--learn-loss-ratio",
            "--pooling", "mean",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.train_file, "train.conllu");
        assert_eq!(cfg.input.root_representation, RootRepresentation::BoundaryToken);
        assert!(!cfg.input.skip_too_long_input);
        assert_eq!(cfg.loss_ratio, LossRatio::Learned);
        assert_eq!(cfg.pooling, WordPooling::Mean);
    }

    #[test]
    fn test_default_pooling_is_start_plus_end() {
        let cli = Cli::try_parse_from(["biaffine-parser", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.pooling, WordPooling::Sum);
        assert_eq!(cfg.loss_ratio, LossRatio::Fixed(0.5));
        assert!(cfg.input.skip_too_long_input);
    }

    #[test]
    fn test_score_checkpoint_choice() {
        let cli = Cli::try_parse_from([
            "biaffine-parser", "score", "--corpus", "test.conllu", "--checkpoint", "3",
        ])
        .unwrap();
        let Commands::Score(args) = cli.command else { panic!("expected score") };
        assert_eq!(args.checkpoint, CheckpointChoice::Epoch(3));
    }

    #[test]
    fn test_bad_root_representation_is_rejected() {
        let result = Cli::try_parse_from([
            "biaffine-parser", "convert", "--corpus", "c.conllu", "--root-representation", "nope",
        ]);
        assert!(result.is_err());
    }
}
