//! Submission history index
//!
//! Partitions submitted records into one bucket per section (or per quarter
//! for quarterly audits) and paginates each bucket independently.

use crate::types::{ProgramType, Section, SlotId, SubmittedRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Records per history page
pub const PAGE_SIZE: usize = 5;

/// How section buckets match record labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// The record's label must map to the bucket's section
    #[default]
    Exact,
    /// The record's raw label must contain the bucket's canonical label
    LegacySubstring,
}

/// History buckets shown for a program type
pub fn bucket_ids_for(program_type: ProgramType) -> Vec<SlotId> {
    program_type.slots()
}

/// Number of pages needed for `len` records
pub const fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// What to render for one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketView<'a> {
    /// The bucket holds no records
    NoData,
    /// One page of records
    Page {
        /// 1-based current page
        current: usize,
        /// Total pages
        total: usize,
        /// Records on the current page
        records: &'a [SubmittedRecord],
    },
}

#[derive(Debug, Clone)]
struct Bucket {
    records: Vec<SubmittedRecord>,
    page: usize,
}

impl Bucket {
    fn total(&self) -> usize {
        page_count(self.records.len())
    }

    fn clamp(&self, page: usize) -> usize {
        page.clamp(1, self.total().max(1))
    }
}

/// Records partitioned into paginated buckets
#[derive(Debug, Clone)]
pub struct HistoryIndex {
    buckets: BTreeMap<SlotId, Bucket>,
    order: Vec<SlotId>,
}

fn bucket_matches(bucket: SlotId, record: &SubmittedRecord, mode: MatchMode) -> bool {
    match (bucket, mode) {
        (SlotId::Quarter(quarter), _) => record.quarter == quarter,
        (SlotId::Section(section), MatchMode::Exact) => {
            Section::from_label(&record.section) == Some(section)
        }
        (SlotId::Section(section), MatchMode::LegacySubstring) => {
            record.section.contains(section.label())
        }
    }
}

impl HistoryIndex {
    /// Partition `records` into `bucket_ids`, preserving record order
    ///
    /// A record may land in several buckets under `LegacySubstring`, or in
    /// none if its label is unknown.
    pub fn build(records: &[SubmittedRecord], bucket_ids: &[SlotId], mode: MatchMode) -> Self {
        let buckets: BTreeMap<SlotId, Bucket> = bucket_ids
            .iter()
            .map(|&id| {
                let records: Vec<SubmittedRecord> = records
                    .iter()
                    .filter(|r| bucket_matches(id, r, mode))
                    .cloned()
                    .collect();
                (id, Bucket { records, page: 1 })
            })
            .collect();

        debug!(
            records = records.len(),
            buckets = buckets.len(),
            ?mode,
            "Built history index"
        );

        Self {
            buckets,
            order: bucket_ids.to_vec(),
        }
    }

    /// Bucket ids in display order
    pub fn bucket_ids(&self) -> &[SlotId] {
        &self.order
    }

    /// Every record in `bucket`
    pub fn records(&self, bucket: SlotId) -> &[SubmittedRecord] {
        self.buckets
            .get(&bucket)
            .map(|b| b.records.as_slice())
            .unwrap_or_default()
    }

    /// Current page of `bucket`, 1-based
    pub fn current_page(&self, bucket: SlotId) -> usize {
        self.buckets.get(&bucket).map_or(1, |b| b.page)
    }

    /// Show page `page` of `bucket`, clamped into range
    ///
    /// Returns the page now shown, or `None` for an unknown bucket.
    pub fn set_page(&mut self, bucket: SlotId, page: usize) -> Option<usize> {
        let b = self.buckets.get_mut(&bucket)?;
        b.page = b.clamp(page);
        Some(b.page)
    }

    /// Advance `bucket` one page
    pub fn next_page(&mut self, bucket: SlotId) -> Option<usize> {
        let current = self.buckets.get(&bucket)?.page;
        self.set_page(bucket, current.saturating_add(1))
    }

    /// Go back one page in `bucket`
    pub fn prev_page(&mut self, bucket: SlotId) -> Option<usize> {
        let current = self.buckets.get(&bucket)?.page;
        self.set_page(bucket, current.saturating_sub(1))
    }

    /// What to render for `bucket`
    pub fn view(&self, bucket: SlotId) -> BucketView<'_> {
        let Some(b) = self.buckets.get(&bucket) else {
            return BucketView::NoData;
        };
        if b.records.is_empty() {
            return BucketView::NoData;
        }

        let start = (b.page - 1) * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(b.records.len());
        BucketView::Page {
            current: b.page,
            total: b.total(),
            records: &b.records[start..end],
        }
    }
}
