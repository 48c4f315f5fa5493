//! Staging store
//!
//! Holds at most one not-yet-submitted file per slot. Staging is local
//! bookkeeping only; nothing here talks to the transport.

use crate::error::ValidationError;
use crate::types::{FileSlot, ProgramType, SlotId, StagedFile, UploadRules};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Field name reported when the extraction date is missing
const DATE_EXTRACTED_FIELD: &str = "date extracted on";

/// Per-session staging area keyed by slot
#[derive(Debug, Clone)]
pub struct StagingStore {
    program_type: ProgramType,
    slots: BTreeMap<SlotId, FileSlot>,
}

impl StagingStore {
    /// Create an empty store for a program type
    pub const fn new(program_type: ProgramType) -> Self {
        Self {
            program_type,
            slots: BTreeMap::new(),
        }
    }

    /// Program type whose rules this store enforces
    pub const fn program_type(&self) -> ProgramType {
        self.program_type
    }

    /// Upload rules in force
    pub const fn rules(&self) -> UploadRules {
        self.program_type.upload_rules()
    }

    /// Slots offered for staging, in natural order
    pub fn slots(&self) -> Vec<SlotId> {
        self.program_type.slots()
    }

    /// Validate `file` and stage it into `slot`
    ///
    /// Replaces whatever the slot held before, including a file that was
    /// already submitted.
    pub fn stage(
        &mut self,
        slot: SlotId,
        file: Option<StagedFile>,
    ) -> Result<&FileSlot, ValidationError> {
        if !self.program_type.slots().contains(&slot) {
            return Err(ValidationError::UnknownSlot { slot });
        }

        let file = file.ok_or(ValidationError::MissingFile { slot })?;
        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingFile { slot })?;

        let rules = self.rules();
        let extension = extension_of(&file.path)
            .filter(|ext| rules.allowed_extensions.contains(&ext.as_str()))
            .ok_or_else(|| ValidationError::InvalidExtension {
                file_name: file_name.clone(),
                allowed: rules.allowed_extensions.join(", "),
            })?;

        if rules.requires_date_extracted && file.date_extracted_on.is_none() {
            return Err(ValidationError::MissingField {
                slot,
                field: DATE_EXTRACTED_FIELD,
            });
        }

        debug!(%slot, %file_name, "Staging file");

        let staged = FileSlot {
            slot,
            file_name,
            mime_type: mime_for_extension(&extension).to_string(),
            staged_at: Utc::now(),
            path: file.path,
            date_extracted_on: file.date_extracted_on,
            server_record_id: None,
        };

        self.slots.insert(slot, staged);
        Ok(&self.slots[&slot])
    }

    /// Remove the entry for `slot`
    pub fn clear(&mut self, slot: SlotId) -> Option<FileSlot> {
        self.slots.remove(&slot)
    }

    /// Remove every entry, returning how many were unsubmitted
    pub fn clear_all(&mut self) -> usize {
        let discarded = self.slots.values().filter(|s| s.is_unsubmitted()).count();
        self.slots.clear();
        discarded
    }

    /// Attach the server id returned for the upload of `uploaded`
    ///
    /// Returns false, leaving the slot alone, if the slot was cleared or now
    /// holds a different file than the one sent.
    pub fn mark_submitted(&mut self, uploaded: &FileSlot, record_id: u64) -> bool {
        match self.slots.get_mut(&uploaded.slot) {
            Some(entry) if entry.is_same_upload(uploaded) => {
                entry.server_record_id = Some(record_id);
                true
            }
            _ => false,
        }
    }

    /// Entry for `slot`, submitted or not
    pub fn get(&self, slot: SlotId) -> Option<&FileSlot> {
        self.slots.get(&slot)
    }

    /// All entries lacking a server id, in slot order
    pub fn list_unsubmitted(&self) -> Vec<FileSlot> {
        self.slots
            .values()
            .filter(|s| s.is_unsubmitted())
            .cloned()
            .collect()
    }

    /// Whether any entry still needs submitting
    pub fn has_unsubmitted(&self) -> bool {
        self.slots.values().any(FileSlot::is_unsubmitted)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "csv" => "text/csv",
        "txt" | "dat" => "text/plain",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
