//! CLI frontend for the Fabula narrative engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fabula",
    about = "Fabula — an interactive-fiction graph engine",
    version,
    propagate_version = true
)]
struct Cli {
    /// Enable tracing output (RUST_LOG controls the filter)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a story in the terminal
    Play {
        /// Story document (JSON)
        story: PathBuf,

        /// RNG seed for deterministic draws
        #[arg(short, long)]
        seed: Option<u64>,

        /// Skip reveal and auto-advance delays
        #[arg(long)]
        fast: bool,

        /// Decide forks by group vote (enter votes as "<player> <number>")
        #[arg(long)]
        shared: bool,
    },

    /// Validate a story document and report problems
    Check {
        /// Story document (JSON)
        story: PathBuf,
    },

    /// Export the fragment graph as Graphviz DOT
    Graph {
        /// Story document (JSON)
        story: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Play {
            story,
            seed,
            fast,
            shared,
        } => commands::play::run(&story, seed, fast, shared).await,
        Commands::Check { story } => commands::check::run(&story),
        Commands::Graph { story, output } => commands::graph::run(&story, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
