//! gradeforge CLI: grade submissions from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::evaluate::OutputFormat;

#[derive(Parser)]
#[command(name = "gradeforge", version, about = "Assignment evaluation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade submissions against an assignment
    Evaluate {
        /// Assignment file (.toml or .json)
        #[arg(long)]
        assignment: PathBuf,

        /// Submission file or directory of submissions
        #[arg(long)]
        submission: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Max concurrent evaluations (default: from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check assignment definitions for problems
    Validate {
        /// Assignment file or directory
        #[arg(long)]
        assignment: PathBuf,
    },

    /// List assignment types that can be graded
    Types {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example assignment
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradeforge=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate {
            assignment,
            submission,
            format,
            parallelism,
            config,
        } => {
            commands::evaluate::execute(assignment, submission, format, parallelism, config).await
        }
        Commands::Validate { assignment } => commands::validate::execute(assignment),
        Commands::Types { config } => commands::types::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
