//! Status command - fetch or poll one record's processing status

use crate::cli::progress::CliProgress;
use crate::cli::style::{self, Stylize};
use anstream::println;
use datafile_portal::config::Config;
use datafile_portal::error::{Error, Result};
use datafile_portal::poll::{PollOutcome, poll_until};
use datafile_portal::transport::create_transport;
use datafile_portal::types::{Status, StatusReport};
use tokio_util::sync::CancellationToken;

/// Run the status command
pub async fn run_status(config: &Config, id: u64, wait: bool) -> Result<()> {
    let transport = create_transport(config)?;

    let report = if wait {
        let progress = CliProgress::verbose();
        progress.start_spinner(format!("Waiting for record #{id}..."));

        let cancel = CancellationToken::new();
        let outcome = poll_until(
            || transport.get_status(id),
            |report: &StatusReport| report.status.is_terminal(),
            config.poll_config(),
            &cancel,
        )
        .await;
        progress.finish_spinner();

        match outcome {
            PollOutcome::Terminal(report) => report,
            PollOutcome::Failed(e) => return Err(e),
            PollOutcome::Exhausted { attempts } => {
                println!(
                    "{}",
                    format!("Still processing after {attempts} checks").warn().for_stdout()
                );
                StatusReport {
                    status: Status::TimedOut,
                    error_count: None,
                }
            }
            PollOutcome::Cancelled => {
                return Err(Error::Internal("status polling cancelled".to_string()));
            }
        }
    } else {
        transport.get_status(id).await?
    };

    let label = format!("#{id}");
    match report.error_count {
        Some(count) => println!(
            "Record {}: {} {}",
            label.accent(),
            style::status(report.status),
            format!("({count} errors)").muted()
        ),
        None => println!("Record {}: {}", label.accent(), style::status(report.status)),
    }
    Ok(())
}
