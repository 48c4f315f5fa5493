//! CLI commands
//!
//! Command implementations for the `dfp` binary.

mod history;
mod interactive;
mod progress;
mod status;
pub mod style;
mod submit;

pub use history::{HistoryArgs, run_history};
pub use interactive::run_interactive;
pub use status::run_status;
pub use submit::{SubmitArgs, run_submit};

use datafile_portal::types::SlotId;
use std::path::PathBuf;

/// Parse a `SLOT=PATH` argument
pub fn parse_slot_file(raw: &str) -> Result<(SlotId, PathBuf), String> {
    let (slot, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PATH, got {raw}"))?;
    if path.is_empty() {
        return Err(format!("missing path for slot {slot}"));
    }
    let slot = slot.parse::<SlotId>().map_err(|e| e.to_string())?;
    Ok((slot, PathBuf::from(path)))
}

/// Parse a `BUCKET=N` argument
pub fn parse_bucket_page(raw: &str) -> Result<(SlotId, usize), String> {
    let (bucket, page) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected BUCKET=N, got {raw}"))?;
    let bucket = bucket.parse::<SlotId>().map_err(|e| e.to_string())?;
    let page = page
        .parse::<usize>()
        .map_err(|_| format!("not a page number: {page}"))?;
    Ok((bucket, page))
}
