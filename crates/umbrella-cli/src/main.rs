//! umbrella - module graph merger CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use umbrella_cli::cmd;
use umbrella_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Merge {
            plan,
            variants,
            build_dir,
            force,
        } => cmd::merge::merge(&plan, &variants, build_dir, force, quiet).await,
        Commands::Collect {
            plan,
            variant,
            output,
            build_dir,
        } => cmd::collect::collect(&plan, &variant, output, build_dir).await,
        Commands::Pom {
            dependencies,
            output,
            coordinate,
            into,
        } => cmd::pom::pom(&dependencies, &output, coordinate.as_deref(), into.as_deref()),
        Commands::Sources {
            plan,
            variant,
            build_dir,
        } => cmd::sources::sources(&plan, &variant, build_dir, quiet).await,
        Commands::Graph {
            plan,
            variant,
            json,
        } => cmd::graph::graph(&plan, variant.as_deref(), json).await,
        Commands::Remap {
            class,
            namespace,
            output,
        } => cmd::remap::remap(&class, &namespace, output.as_deref()),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
