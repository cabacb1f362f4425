use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod tasks;

#[derive(Parser)]
#[command(
    name = "burn-segnet",
    about = "Semantic segmentation evaluation and deployment toolkit",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score predicted masks against annotations.
    Evaluate(tasks::evaluate::EvaluateArgs),
    /// Render a class mask as a colour image.
    Visualize(tasks::visualize::VisualizeArgs),
    /// Emit a MaixPy detector script.
    GenerateScript(tasks::generate_script::GenerateScriptArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Evaluate(args) => tasks::evaluate::run(args),
        Commands::Visualize(args) => tasks::visualize::run(args),
        Commands::GenerateScript(args) => tasks::generate_script::run(args),
    }
}
