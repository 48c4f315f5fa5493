//! Interactive session (default when no subcommand given)
//!
//! Stages files and edits session parameters through the unsaved-changes
//! guard, submits, and browses the history of the current session.

use crate::cli::history::render_view;
use crate::cli::progress::CliProgress;
use crate::cli::style::{self, Stylize};
use anstream::{print, println};
use chrono::NaiveDate;
use datafile_portal::config::Config;
use datafile_portal::error::{Error, Result};
use datafile_portal::guard::{GuardDecision, Resolution, Trigger, UnsavedChangesGuard};
use datafile_portal::history::{HistoryIndex, bucket_ids_for, page_count};
use datafile_portal::records::RecordStore;
use datafile_portal::session::{SessionChange, SessionState};
use datafile_portal::submit::{SubmitOutcome, Submitter, transform_for};
use datafile_portal::transport::create_transport;
use datafile_portal::types::{
    ProgramType, Quarter, RecordFilters, SlotId, StagedFile, SubmissionSession,
};
use dialoguer::{Confirm, Input, Select};
use std::path::PathBuf;
use std::sync::Arc;

const PROGRAM_TYPES: [ProgramType; 6] = [
    ProgramType::Tanf,
    ProgramType::Ssp,
    ProgramType::Tribal,
    ProgramType::WorkOutcomes,
    ProgramType::ProgramAudit,
    ProgramType::FeedbackReports,
];

#[derive(Clone, Copy)]
enum Action {
    Stage,
    Clear,
    ChangeYear,
    ChangeQuarter,
    ChangeProgram,
    ChangeOrganization,
    Submit,
    History,
    CancelWork,
    Quit,
}

impl Action {
    const ALL: [Self; 10] = [
        Self::Stage,
        Self::Clear,
        Self::ChangeYear,
        Self::ChangeQuarter,
        Self::ChangeProgram,
        Self::ChangeOrganization,
        Self::Submit,
        Self::History,
        Self::CancelWork,
        Self::Quit,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Stage => "Stage a file",
            Self::Clear => "Clear a staged file",
            Self::ChangeYear => "Change fiscal year",
            Self::ChangeQuarter => "Change quarter",
            Self::ChangeProgram => "Change program type",
            Self::ChangeOrganization => "Change organization",
            Self::Submit => "Submit staged files",
            Self::History => "View submission history",
            Self::CancelWork => "Cancel",
            Self::Quit => "Quit",
        }
    }
}

fn prompt<T>(result: dialoguer::Result<T>) -> Result<T> {
    result.map_err(|dialoguer::Error::IO(e)| Error::Io(e))
}

fn select_quarter(prompt_text: &str, default: Quarter) -> Result<Quarter> {
    let default = Quarter::ALL.iter().position(|q| *q == default).unwrap_or(0);
    let index = prompt(
        Select::new()
            .with_prompt(prompt_text)
            .items(&Quarter::ALL)
            .default(default)
            .interact(),
    )?;
    Ok(Quarter::ALL[index])
}

fn select_program(default: ProgramType) -> Result<ProgramType> {
    let default = PROGRAM_TYPES.iter().position(|p| *p == default).unwrap_or(0);
    let index = prompt(
        Select::new()
            .with_prompt("Program type")
            .items(&PROGRAM_TYPES)
            .default(default)
            .interact(),
    )?;
    Ok(PROGRAM_TYPES[index])
}

fn ask_session() -> Result<SubmissionSession> {
    let (current_year, current_quarter) = Quarter::for_date(chrono::Local::now().date_naive());
    let year = prompt(
        Input::<i32>::new()
            .with_prompt("Fiscal year")
            .default(current_year)
            .interact_text(),
    )?;
    let quarter = select_quarter("Quarter", current_quarter)?;
    let program_type = select_program(ProgramType::Tanf)?;
    let organization_id = prompt(
        Input::<u64>::new()
            .with_prompt("Organization id")
            .interact_text(),
    )?;

    Ok(SubmissionSession {
        year,
        quarter,
        program_type,
        organization_id,
    })
}

fn print_session(guard: &UnsavedChangesGuard) {
    let session = guard.selection();
    println!();
    println!(
        "{} {} {} {}",
        session.program_type.emphasis(),
        format!("FY{}", session.year).accent(),
        session.quarter.accent(),
        format!("org {}", session.organization_id).muted()
    );

    let staged = guard.state().list_unsubmitted();
    if staged.is_empty() {
        println!("  {}", "No files staged".muted());
    }
    for file in staged {
        println!("  {} {}", file.slot.emphasis(), file.file_name.accent());
    }
}

fn select_slot(slots: &[SlotId], prompt_text: &str) -> Result<SlotId> {
    let index = prompt(
        Select::new()
            .with_prompt(prompt_text)
            .items(slots)
            .default(0)
            .interact(),
    )?;
    Ok(slots[index])
}

fn stage_file(state: &SessionState) -> Result<()> {
    let slots = state.with_staging(|s| s.slots());
    let slot = select_slot(&slots, "Slot")?;
    let path: String = prompt(Input::new().with_prompt("File path").interact_text())?;

    let mut file = StagedFile::new(PathBuf::from(path));
    if state.with_staging(|s| s.rules().requires_date_extracted) {
        let date: String = prompt(
            Input::new()
                .with_prompt("Date extracted (YYYY-MM-DD)")
                .interact_text(),
        )?;
        let date = date
            .parse::<NaiveDate>()
            .map_err(|e| Error::Parse(format!("invalid date {date}: {e}")))?;
        file = file.with_date_extracted_on(date);
    }

    match state.stage(slot, Some(file)) {
        Ok(staged) => println!("{} Staged {}", style::check(), staged.file_name.accent()),
        Err(e) => println!("{} {}", style::cross().for_stdout(), e.to_string().warn().for_stdout()),
    }
    Ok(())
}

fn clear_file(state: &SessionState) -> Result<()> {
    let staged: Vec<SlotId> = state.list_unsubmitted().iter().map(|f| f.slot).collect();
    if staged.is_empty() {
        println!("{}", "Nothing staged".muted());
        return Ok(());
    }
    let slot = select_slot(&staged, "Clear which slot?")?;
    state.clear(slot);
    Ok(())
}

fn resolve(guard: &mut UnsavedChangesGuard, decision: GuardDecision) -> Result<Option<Resolution>> {
    if decision == GuardDecision::Applied {
        return Ok(None);
    }

    let question = match guard.trigger() {
        Some(Trigger::CancelWork) => "You have files that have not been submitted. Discard them?",
        _ => "You have files that have not been submitted. Discard them and change parameters?",
    };
    let discard = prompt(
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact(),
    )?;

    let resolution = if discard {
        guard.discard_and_proceed()
    } else {
        guard.keep_working()
    };
    Ok(Some(resolution))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageMove {
    Next,
    Prev,
}

/// Page moves available from each bucket's current page
fn page_moves(index: &HistoryIndex) -> Vec<(SlotId, PageMove)> {
    let mut moves = Vec::new();
    for &bucket in index.bucket_ids() {
        let current = index.current_page(bucket);
        if current < page_count(index.records(bucket).len()) {
            moves.push((bucket, PageMove::Next));
        }
        if current > 1 {
            moves.push((bucket, PageMove::Prev));
        }
    }
    moves
}

async fn show_history(
    submitter: &Submitter,
    session: SubmissionSession,
    config: &Config,
) -> Result<()> {
    let filters = RecordFilters::for_session(&session);
    let Ok(records) = submitter.load_history(&filters).await else {
        return Ok(());
    };

    let buckets = bucket_ids_for(session.program_type);
    let mut index = HistoryIndex::build(&records, &buckets, config.match_mode());
    loop {
        for &bucket in index.bucket_ids() {
            println!();
            println!("{}", bucket.emphasis());
            print!("{}", render_view(&index.view(bucket)));
        }

        let moves = page_moves(&index);
        if moves.is_empty() {
            return Ok(());
        }
        let mut items: Vec<String> = moves
            .iter()
            .map(|(bucket, dir)| match dir {
                PageMove::Next => format!("Next page of {bucket}"),
                PageMove::Prev => format!("Previous page of {bucket}"),
            })
            .collect();
        items.push("Back".to_string());

        let choice = prompt(
            Select::new()
                .with_prompt("History")
                .items(&items)
                .default(items.len() - 1)
                .interact(),
        )?;
        match moves.get(choice) {
            Some(&(bucket, PageMove::Next)) => {
                index.next_page(bucket);
            }
            Some(&(bucket, PageMove::Prev)) => {
                index.prev_page(bucket);
            }
            None => return Ok(()),
        }
    }
}

/// Run the interactive session
pub async fn run_interactive(config: &Config) -> Result<()> {
    let transport = create_transport(config)?;
    let progress = Arc::new(CliProgress::compact());
    let submitter = Submitter::new(
        transport,
        RecordStore::new(),
        Arc::clone(&progress) as _,
        config.poll_config(),
    );

    let mut guard = UnsavedChangesGuard::new(SessionState::new(ask_session()?));
    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();

    loop {
        print_session(&guard);
        let index = prompt(
            Select::new()
                .with_prompt("What next?")
                .items(&labels)
                .default(0)
                .interact(),
        )?;
        let state = guard.state().clone();
        let current = state.session();

        let decision = match Action::ALL[index] {
            Action::Stage => {
                stage_file(&state)?;
                continue;
            }
            Action::Clear => {
                clear_file(&state)?;
                continue;
            }
            Action::Submit => {
                let transform = transform_for(current.program_type);
                if let Ok(SubmitOutcome::Completed(result)) =
                    submitter.submit(&state, transform.as_ref()).await
                {
                    println!(
                        "{}",
                        format!("{} record(s) created", result.submitted.len()).muted()
                    );
                }
                continue;
            }
            Action::History => {
                show_history(&submitter, current, config).await?;
                continue;
            }
            Action::Quit => {
                if state.has_unsubmitted()
                    && !prompt(
                        Confirm::new()
                            .with_prompt("Staged files will be lost. Quit anyway?")
                            .default(false)
                            .interact(),
                    )?
                {
                    continue;
                }
                break;
            }
            Action::ChangeYear => {
                let year = prompt(
                    Input::<i32>::new()
                        .with_prompt("Fiscal year")
                        .default(current.year)
                        .interact_text(),
                )?;
                guard.request_change(SessionChange::Year(year))
            }
            Action::ChangeQuarter => {
                let quarter = select_quarter("Quarter", current.quarter)?;
                guard.request_change(SessionChange::Quarter(quarter))
            }
            Action::ChangeProgram => {
                let program_type = select_program(current.program_type)?;
                guard.request_change(SessionChange::ProgramType(program_type))
            }
            Action::ChangeOrganization => {
                let org = prompt(
                    Input::<u64>::new()
                        .with_prompt("Organization id")
                        .default(current.organization_id)
                        .interact_text(),
                )?;
                guard.request_change(SessionChange::Organization(org))
            }
            Action::CancelWork => guard.request_cancel(),
        };

        match resolve(&mut guard, decision)? {
            Some(Resolution::Reverted(_)) => println!("{}", "Kept staged files".muted()),
            Some(Resolution::WorkCancelled) => println!("{}", "Staged files discarded".muted()),
            Some(Resolution::Applied(_)) => {
                println!("{}", "Staged files discarded, parameters changed".muted());
            }
            Some(Resolution::NothingPending) | None => {}
        }
    }

    submitter.tracker().cancel_all();
    Ok(())
}
