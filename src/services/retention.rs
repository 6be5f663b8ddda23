// src/services/retention.rs
//
// Photo and address purge for clock records past their retention window.
// Times, GPS coordinates and face flags are kept.

use crate::{
    config::RetentionConfig,
    errors::{AppError, AppResult},
    models::{MEDIA_FIELDS, RetentionLog},
    repository::RetentionRepository,
};
use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceSummary {
    /// Records that hold, or once held, media.
    pub total: u64,
    /// Past the soft window, media still present.
    pub pending: u64,
    /// Past the hard window, media still present.
    pub overdue: u64,
    /// Media already cleared.
    pub completed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionReport {
    pub processed: u64,
    pub deleted: u64,
    /// Dry run: records that would have been cleared.
    pub planned: u64,
    pub skipped: u64,
    pub errors: u64,
    pub dry_run: bool,
    pub cancelled: bool,
    pub cutoff: Option<DateTime<Utc>>,
    pub failures: Vec<(Uuid, String)>,
    pub summary: ComplianceSummary,
}

impl RetentionReport {
    pub fn exit_code(&self) -> u8 {
        if self.errors > 0 { 1 } else { 0 }
    }
}

/// Soft and hard cutoffs for `now`. Media captured at or before a cutoff is
/// inside that window.
pub fn retention_cutoffs(
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let back = |months: u32| {
        now.checked_sub_months(Months::new(months))
            .ok_or_else(|| AppError::Config(format!("Retention window of {months} months is out of range")))
    };
    Ok((back(config.soft_delete_months)?, back(config.hard_delete_months)?))
}

/// Clears media from every eligible record, batch by batch, each record in
/// its own transaction together with its log entry. A failing record is
/// counted and skipped; the sweep carries on.
pub async fn run_retention_sweep(
    repo: &dyn RetentionRepository,
    config: &RetentionConfig,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> AppResult<RetentionReport> {
    config.validate()?;
    let (soft_cutoff, hard_cutoff) = retention_cutoffs(config, now)?;
    // The hard window is never shorter, so the soft cutoff covers it.
    let cutoff = if config.force { now } else { soft_cutoff };

    let mut report = RetentionReport {
        dry_run: config.dry_run,
        cutoff: Some(cutoff),
        ..RetentionReport::default()
    };
    let cap = u64::from(config.max_records_per_run);
    let fields: Vec<String> = MEDIA_FIELDS.iter().map(|f| f.to_string()).collect();

    info!(
        "Retention sweep started: cutoff {}, batch {}, dry_run={}, force={}",
        cutoff, config.batch_size, config.dry_run, config.force
    );

    // Cleared records drop out of the eligible set, so the offset only moves
    // past records left behind.
    let mut offset: u32 = 0;
    while report.processed < cap {
        if cancel.is_cancelled() {
            warn!("Retention sweep cancelled after {} records", report.processed);
            report.cancelled = true;
            break;
        }

        let limit = (cap - report.processed).min(u64::from(config.batch_size)) as u32;
        let batch = repo.list_eligible_for_retention(cutoff, limit, offset).await?;
        if batch.is_empty() {
            break;
        }
        debug!("Fetched {} eligible records at offset {}", batch.len(), offset);

        for record in batch {
            report.processed += 1;

            if !record.has_media() {
                report.skipped += 1;
                offset += 1;
                continue;
            }

            if config.dry_run {
                info!(
                    "[dry run] would clear {} media fields on record {} (eligible since {:?})",
                    record.populated_media_fields().len(),
                    record.id,
                    record.media_retention_eligible_at
                );
                report.planned += 1;
                offset += 1;
                continue;
            }

            let log = RetentionLog {
                id: Uuid::new_v4(),
                clock_record_id: record.id,
                cleared_fields: fields.clone(),
                cleared_at: now,
            };
            match repo.clear_media_with_log(record.id, &fields, now, &log).await {
                Ok(true) => {
                    debug!("Cleared media on record {}", record.id);
                    report.deleted += 1;
                }
                Ok(false) => {
                    // Cleared by a concurrent sweep since it was listed.
                    report.skipped += 1;
                    offset += 1;
                }
                Err(e) => {
                    error!("Failed to clear media on record {}: {}", record.id, e);
                    report.errors += 1;
                    report.failures.push((record.id, e.to_string()));
                    offset += 1;
                }
            }
        }
    }

    report.summary = repo.retention_summary(soft_cutoff, hard_cutoff).await?;
    info!(
        "Retention sweep finished: processed={} deleted={} planned={} skipped={} errors={}",
        report.processed, report.deleted, report.planned, report.skipped, report.errors
    );
    if report.summary.overdue > 0 {
        warn!(
            "{} records are past the hard retention window with media still present",
            report.summary.overdue
        );
    }
    Ok(report)
}
