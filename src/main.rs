//! dfp - stage, submit and track quarterly data files
//!
//! CLI binary for the data file portal.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use datafile_portal::config::Config;
use datafile_portal::types::{ProgramType, Quarter, SlotId};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[derive(Parser)]
#[command(name = "dfp")]
#[command(about = "Stage, submit and track quarterly program data files")]
#[command(version)]
struct Cli {
    /// Path to a config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL (overrides config and environment)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage and submit data files, then wait for processing
    Submit {
        /// Fiscal year
        #[arg(long)]
        year: i32,

        /// Fiscal quarter (Q1-Q4)
        #[arg(long)]
        quarter: Quarter,

        /// Program type (tanf, ssp, tribal, work-outcomes, program-audit, feedback-reports)
        #[arg(long)]
        program: ProgramType,

        /// Organization id
        #[arg(long)]
        org: u64,

        /// File to stage, as SLOT=PATH (e.g. "active=report.csv", "Q2=audit.xlsx")
        #[arg(long = "file", required = true, value_parser = cli::parse_slot_file)]
        files: Vec<(SlotId, PathBuf)>,

        /// Extraction date (YYYY-MM-DD), required for feedback reports
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Return once records are created, without waiting for processing
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the processing status of one record
    Status {
        /// Record id
        id: u64,

        /// Poll until the record reaches a terminal status
        #[arg(long)]
        wait: bool,
    },

    /// List submitted records grouped by section
    History {
        /// Fiscal year
        #[arg(long)]
        year: i32,

        /// Program type
        #[arg(long)]
        program: ProgramType,

        /// Organization id
        #[arg(long)]
        org: u64,

        /// Restrict to one quarter
        #[arg(long)]
        quarter: Option<Quarter>,

        /// Page to show for a bucket, as BUCKET=N
        #[arg(long = "page", value_parser = cli::parse_bucket_page)]
        pages: Vec<(SlotId, usize)>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Match sections by substring (older servers)
        #[arg(long)]
        legacy_match: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(server) = cli.server {
        config.server_url = Some(server);
    }

    match cli.command {
        None => {
            // Default: interactive session
            cli::run_interactive(&config).await?;
        }
        Some(Commands::Submit {
            year,
            quarter,
            program,
            org,
            files,
            date,
            no_wait,
        }) => {
            let args = cli::SubmitArgs {
                year,
                quarter,
                program_type: program,
                organization_id: org,
                files,
                date_extracted_on: date,
                wait: !no_wait,
            };
            cli::run_submit(&config, args).await?;
        }
        Some(Commands::Status { id, wait }) => {
            cli::run_status(&config, id, wait).await?;
        }
        Some(Commands::History {
            year,
            program,
            org,
            quarter,
            pages,
            json,
            legacy_match,
        }) => {
            if legacy_match {
                config.history.legacy_substring_match = true;
            }
            let args = cli::HistoryArgs {
                year,
                program_type: program,
                organization_id: org,
                quarter,
                pages,
                json,
            };
            cli::run_history(&config, args).await?;
        }
    }

    Ok(())
}
