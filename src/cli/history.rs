//! History command - list submitted records grouped into paginated buckets

use crate::cli::style::{self, Stylize};
use anstream::{print, println};
use datafile_portal::config::Config;
use datafile_portal::error::Result;
use datafile_portal::history::{BucketView, HistoryIndex, bucket_ids_for};
use datafile_portal::transport::create_transport;
use datafile_portal::types::{ProgramType, Quarter, RecordFilters, SlotId, SubmittedRecord};
use serde::Serialize;
use std::fmt::Write;

/// Arguments of `dfp history`
pub struct HistoryArgs {
    /// Fiscal year
    pub year: i32,
    /// Program type
    pub program_type: ProgramType,
    /// Organization id
    pub organization_id: u64,
    /// Restrict to one quarter
    pub quarter: Option<Quarter>,
    /// Requested page per bucket
    pub pages: Vec<(SlotId, usize)>,
    /// Print JSON
    pub json: bool,
}

#[derive(Serialize)]
struct BucketJson<'a> {
    bucket: String,
    #[serde(flatten)]
    view: BucketView<'a>,
}

/// Run the history command
pub async fn run_history(config: &Config, args: HistoryArgs) -> Result<()> {
    let transport = create_transport(config)?;
    let filters = RecordFilters {
        year: args.year,
        program_type: args.program_type,
        organization_id: args.organization_id,
        quarter: args.quarter,
        section: None,
    };
    let records = transport.list_records(&filters).await?;

    let buckets = bucket_ids_for(args.program_type);
    let mut index = HistoryIndex::build(&records, &buckets, config.match_mode());
    for (bucket, page) in args.pages {
        if index.set_page(bucket, page).is_none() {
            tracing::warn!(%bucket, "No such bucket for {}", args.program_type);
        }
    }

    if args.json {
        let out: Vec<BucketJson<'_>> = index
            .bucket_ids()
            .iter()
            .map(|&bucket| BucketJson {
                bucket: bucket.to_string(),
                view: index.view(bucket),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "Submission history".emphasis(),
        args.program_type.accent(),
        format!("FY{}", args.year).muted()
    );
    for &bucket in index.bucket_ids() {
        println!();
        println!("{}", bucket.emphasis());
        print!("{}", render_view(&index.view(bucket)));
    }
    Ok(())
}

/// Render one bucket as a plain-text table
pub fn render_view(view: &BucketView<'_>) -> String {
    let mut out = String::new();
    match view {
        BucketView::NoData => out.push_str("  No data available.\n"),
        BucketView::Page {
            current,
            total,
            records,
        } => {
            for record in *records {
                render_row(&mut out, record);
            }
            let _ = writeln!(out, "  Page {current} of {total}");
        }
    }
    out
}

fn render_row(out: &mut String, record: &SubmittedRecord) {
    let _ = writeln!(
        out,
        "  #{:<6} {:<3} {:<28} {:<16} {:<12} {} ({} errors)",
        record.id,
        record.quarter,
        record.file_name,
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.submitted_by,
        style::status(record.status),
        record.error_count
    );
}
