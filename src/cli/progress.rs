//! Shared CLI progress callback with styled output and a polling spinner

use crate::cli::style::{self, Stylize, check, cross, spinner_style};
use anstream::{eprintln, println};
use async_trait::async_trait;
use datafile_portal::error::Error;
use datafile_portal::submit::{Alert, PlannedUpload, ProgressCallback, SubmissionState};
use datafile_portal::types::Status;
use indicatif::{ProgressBar, ProgressDrawTarget};
use std::time::Duration;

/// CLI progress callback that prints to stdout with styled output
///
/// Output printed while the spinner runs is routed through
/// [`ProgressBar::suspend`] so lines do not interleave with it.
pub struct CliProgress {
    /// Verbose mode prints state changes and per-file messages
    pub verbose: bool,
    spinner: ProgressBar,
}

impl CliProgress {
    /// Progress for one-shot commands
    pub fn verbose() -> Self {
        Self::new(true)
    }

    /// Progress for the interactive session
    pub fn compact() -> Self {
        Self::new(false)
    }

    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()),
        }
    }

    /// Show the spinner with `message`
    pub fn start_spinner(&self, message: impl Into<String>) {
        self.spinner.set_style(spinner_style());
        self.spinner.set_draw_target(ProgressDrawTarget::stderr());
        self.spinner.set_message(message.into());
        self.spinner.enable_steady_tick(Duration::from_millis(80));
    }

    /// Remove the spinner
    pub fn finish_spinner(&self) {
        self.spinner.finish_and_clear();
        self.spinner.set_draw_target(ProgressDrawTarget::hidden());
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_state(&self, state: SubmissionState) {
        if self.verbose && state == SubmissionState::Submitting {
            println!("{}...", state.to_string().emphasis());
        }
    }

    async fn on_record_created(&self, upload: &PlannedUpload, record_id: u64) {
        let id = format!("#{record_id}");
        self.spinner.suspend(|| {
            println!(
                "  {} Created record {} for {} ({})",
                check(),
                id.accent(),
                upload.origin.emphasis(),
                upload.file.file_name.muted()
            );
        });
    }

    async fn on_upload_failed(&self, upload: &PlannedUpload, error: &Error) {
        self.spinner.suspend(|| {
            eprintln!(
                "  {} Failed to submit {}: {}",
                cross(),
                upload.origin.accent().for_stderr(),
                error.to_string().error()
            );
        });
    }

    async fn on_status(&self, record_id: u64, status: Status) {
        let id = format!("#{record_id}");
        self.spinner.suspend(|| {
            println!("  Record {} {}", id.accent(), style::status(status));
        });
    }

    async fn on_error(&self, error: &Error) {
        self.spinner.suspend(|| {
            eprintln!("{}: {}", "error".error(), error);
        });
    }

    async fn on_alert(&self, alert: &Alert) {
        self.spinner.suspend(|| style::print_alert(alert));
    }

    async fn on_message(&self, message: &str) {
        if self.verbose {
            self.spinner.suspend(|| println!("  {}", message.muted()));
        }
    }
}
