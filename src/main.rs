use anyhow::Result;
use biaffine_parser::cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("biaffine_parser=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
