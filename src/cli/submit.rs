//! Submit command - stage files, submit them and wait for processing

use crate::cli::progress::CliProgress;
use crate::cli::style::{self, Stylize};
use anstream::println;
use chrono::NaiveDate;
use datafile_portal::config::Config;
use datafile_portal::error::{Error, Result};
use datafile_portal::records::RecordStore;
use datafile_portal::session::SessionState;
use datafile_portal::submit::{SubmitOutcome, Submitter, transform_for};
use datafile_portal::transport::create_transport;
use datafile_portal::types::{ProgramType, Quarter, SlotId, StagedFile, SubmissionSession};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of `dfp submit`
pub struct SubmitArgs {
    /// Fiscal year
    pub year: i32,
    /// Fiscal quarter
    pub quarter: Quarter,
    /// Program type
    pub program_type: ProgramType,
    /// Organization id
    pub organization_id: u64,
    /// Files to stage
    pub files: Vec<(SlotId, PathBuf)>,
    /// Extraction date attached to every staged file
    pub date_extracted_on: Option<NaiveDate>,
    /// Wait for processing to finish
    pub wait: bool,
}

/// Run the submit command
pub async fn run_submit(config: &Config, args: SubmitArgs) -> Result<()> {
    let transport = create_transport(config)?;
    let progress = Arc::new(CliProgress::verbose());
    let records = RecordStore::new();
    let submitter = Submitter::new(
        transport,
        records.clone(),
        Arc::clone(&progress) as _,
        config.poll_config(),
    );

    let session = SessionState::new(SubmissionSession {
        year: args.year,
        quarter: args.quarter,
        program_type: args.program_type,
        organization_id: args.organization_id,
    });

    for (slot, path) in args.files {
        let mut file = StagedFile::new(path);
        if let Some(date) = args.date_extracted_on {
            file = file.with_date_extracted_on(date);
        }
        let staged = session.stage(slot, Some(file))?;
        println!(
            "Staged {} for {}",
            staged.file_name.accent(),
            slot.emphasis()
        );
    }
    println!();

    let transform = transform_for(args.program_type);
    let result = match submitter.submit(&session, transform.as_ref()).await? {
        SubmitOutcome::Completed(result) => result,
        SubmitOutcome::Skipped => return Ok(()),
    };

    if args.wait && !result.submitted.is_empty() {
        println!();
        let pending = result.submitted.len();
        progress.start_spinner(format!(
            "Waiting for {pending} file{} to finish processing...",
            if pending == 1 { "" } else { "s" }
        ));
        submitter.tracker().wait_all().await;
        progress.finish_spinner();

        println!();
        println!("{}", "Final status".emphasis());
        for record in records.snapshot() {
            let id = format!("#{}", record.id);
            println!(
                "  {} {} {} {}",
                id.accent(),
                record.section,
                style::status(record.status),
                format!("({} errors)", record.error_count).muted()
            );
        }
    }

    if result.success {
        Ok(())
    } else {
        Err(Error::Transport(format!(
            "{} of {} file{} could not be submitted",
            result.failed.len(),
            result.failed.len() + result.submitted.len(),
            if result.failed.len() + result.submitted.len() == 1 {
                ""
            } else {
                "s"
            }
        )))
    }
}
