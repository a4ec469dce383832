use clap::{Parser, Subcommand, ValueEnum};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Scan CI, dispatch fix-agent sessions, and track issue status", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Workspace root; defaults to the fleetline home resolution cascade.
    #[arg(long, global = true)]
    pub workspace_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Populate the tracker from CI failures")]
    Scan,

    #[command(about = "Run fix agents over actionable issue groups")]
    Fix {
        /// Overrides the configured max parallel Sessions.
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Overrides the configured default model.
        #[arg(long)]
        model: Option<String>,

        /// Overrides the configured spend budget in USD.
        #[arg(long)]
        budget: Option<f64>,

        /// Skip the CI scan and run against the tracker as it stands.
        #[arg(long)]
        skip_scan: bool,
    },

    #[command(about = "Merge approved pull requests")]
    Merge,

    #[command(about = "Show the tracker")]
    Status {
        /// Emit the tracker as JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Include attempt history per issue group.
        #[arg(short = 'V', long)]
        verbose: bool,
    },

    #[command(about = "Mark an issue group as wont_fix")]
    Dismiss {
        id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    #[command(about = "Reopen a dismissed issue group")]
    Reopen { id: String },
}
