pub mod record;

use crate::analyzer::chart::Granularity;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "PomoStats", about = "Pomodoro session log analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default config and create the data directories
    Init,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    /// Record one session, optionally skipped part way through
    Log {
        #[arg(long)]
        kind: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        skipped_after: Option<u32>,
    },
    /// Import a browser session export (JSON)
    Import { file: PathBuf },
    /// Append one generated Pomodoro cycle ending near now
    Demo {
        #[arg(long, default_value_t = false)]
        replace: bool,
    },
    Stats {
        #[arg(long)]
        now: Option<i64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Insights {
        #[arg(long)]
        now: Option<i64>,
    },
    Chart {
        #[arg(value_enum, default_value_t = Granularity::Daily)]
        granularity: Granularity,
        #[arg(long)]
        now: Option<i64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    Report {
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the HTTP API until Ctrl+C
    Serve,
    /// Delete every recorded session
    Clear {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum ExportCommands {
    Csv {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Png {
        #[arg(long, value_enum, default_value_t = Granularity::Daily)]
        granularity: Granularity,
        #[arg(long)]
        now: Option<i64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}
