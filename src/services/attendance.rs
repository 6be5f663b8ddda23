// src/services/attendance.rs

use crate::{
    config::AttendanceConfig,
    errors::{AppError, AppResult},
    models::{CaptureSource, ClockEvent, ClockRecord, ClockStatus, EventCapture, GpsFix},
    repository::AttendanceRepository,
    services::{
        face_check::{FaceDetector, check_selfie},
        geocode::Geocoder,
    },
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ─── State machine ────────────────────────────────────────────────────────────

/// Where an employee is in their day. Persisted as the four clock columns plus
/// [`ClockStatus`]; `Working2` is stored as `working`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceState {
    NotStarted,
    Working,
    OnBreak,
    Working2,
    Completed,
    AutoClosed,
}

impl AttendanceState {
    pub fn of(record: &ClockRecord) -> Self {
        match record.status {
            ClockStatus::AutoClosed => return Self::AutoClosed,
            ClockStatus::Completed => return Self::Completed,
            _ => {}
        }
        match (
            record.clock_in_1,
            record.clock_out_1,
            record.clock_in_2,
            record.clock_out_2,
        ) {
            (None, ..) => Self::NotStarted,
            (_, _, _, Some(_)) => Self::Completed,
            (_, _, Some(_), None) => Self::Working2,
            (_, Some(_), None, None) => Self::OnBreak,
            (Some(_), None, None, None) => Self::Working,
        }
    }

    /// The state after `event`, or an error if the event is out of order.
    pub fn next(self, event: ClockEvent) -> AppResult<Self> {
        use AttendanceState::*;
        use ClockEvent::*;
        match (self, event) {
            (NotStarted, ClockIn1) => Ok(Working),
            (Working, ClockOut1) => Ok(OnBreak),
            // Break skipped.
            (Working, ClockOut2) => Ok(Completed),
            (OnBreak, ClockIn2) => Ok(Working2),
            (Working2, ClockOut2) => Ok(Completed),
            (state, event) => Err(AppError::Validation(format!(
                "Cannot record {event} while {}",
                state.describe()
            ))),
        }
    }

    pub fn status(self) -> ClockStatus {
        match self {
            Self::NotStarted => ClockStatus::NotStarted,
            Self::Working | Self::Working2 => ClockStatus::Working,
            Self::OnBreak => ClockStatus::OnBreak,
            Self::Completed => ClockStatus::Completed,
            Self::AutoClosed => ClockStatus::AutoClosed,
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Working | Self::OnBreak | Self::Working2)
    }

    fn describe(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Working => "working",
            Self::OnBreak => "on break",
            Self::Working2 => "working after break",
            Self::Completed => "completed",
            Self::AutoClosed => "auto-closed",
        }
    }
}

// ─── Durations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub total_work_minutes: i64,
    pub overtime_minutes: i64,
    pub is_invalid: bool,
}

impl DailyTotals {
    const INVALID: DailyTotals = DailyTotals {
        total_work_minutes: 0,
        overtime_minutes: 0,
        is_invalid: true,
    };
}

/// Wall-clock times laid out on the calendar: each time earlier than the one
/// before it is taken to be on the following day.
pub fn project_timeline(record: &ClockRecord) -> Vec<(ClockEvent, NaiveDateTime)> {
    let mut timeline = Vec::with_capacity(4);
    let mut previous: Option<NaiveDateTime> = None;
    for event in [
        ClockEvent::ClockIn1,
        ClockEvent::ClockOut1,
        ClockEvent::ClockIn2,
        ClockEvent::ClockOut2,
    ] {
        let Some(time) = record.time_of(event) else {
            continue;
        };
        let at = match previous {
            None => record.work_date.and_time(time),
            Some(prev) => project_after(prev, time),
        };
        timeline.push((event, at));
        previous = Some(at);
    }
    timeline
}

fn project_after(previous: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let same_day = previous.date().and_time(time);
    if time < previous.time() {
        same_day + Duration::days(1)
    } else {
        same_day
    }
}

/// Whole minutes from `start` to `end`, wrapping past midnight. `None` when
/// the session is empty.
fn session_minutes(start: NaiveTime, end: NaiveTime) -> Option<i64> {
    let mut span = end - start;
    if span < Duration::zero() {
        span += Duration::days(1);
    }
    let minutes = span.num_minutes();
    (minutes > 0).then_some(minutes)
}

/// Worked and overtime minutes for a record. Any empty or over-long session
/// invalidates the whole day and zeroes both totals.
pub fn compute_daily_totals(record: &ClockRecord, config: &AttendanceConfig) -> DailyTotals {
    let (Some(in_1), out_1, in_2, out_2) = (
        record.clock_in_1,
        record.clock_out_1,
        record.clock_in_2,
        record.clock_out_2,
    ) else {
        return DailyTotals::default();
    };

    let sessions = match (out_1, in_2, out_2) {
        (None, None, Some(out_2)) => vec![(in_1, out_2)],
        (Some(out_1), None, None) => vec![(in_1, out_1)],
        (Some(out_1), Some(_), None) => vec![(in_1, out_1)],
        (Some(out_1), Some(in_2), Some(out_2)) => vec![(in_1, out_1), (in_2, out_2)],
        (None, None, None) => vec![],
        // Second half without the first.
        _ => return DailyTotals::INVALID,
    };

    let mut total = 0;
    for (start, end) in sessions {
        match session_minutes(start, end) {
            Some(minutes) if minutes <= config.max_session_minutes => total += minutes,
            _ => return DailyTotals::INVALID,
        }
    }

    let timeline = project_timeline(record);
    if let (Some((_, first)), Some((_, last))) = (timeline.first(), timeline.last()) {
        if *last - *first > Duration::days(1) {
            return DailyTotals::INVALID;
        }
    }

    let closed = matches!(record.status, ClockStatus::Completed | ClockStatus::AutoClosed);
    if closed && total == 0 {
        return DailyTotals::INVALID;
    }

    DailyTotals {
        total_work_minutes: total,
        overtime_minutes: (total - config.daily_standard_minutes).max(0),
        is_invalid: false,
    }
}

fn apply_totals(record: &mut ClockRecord, totals: DailyTotals) {
    let invalid = record.is_invalid || totals.is_invalid;
    record.is_invalid = invalid;
    if invalid {
        record.total_work_minutes = 0;
        record.overtime_minutes = 0;
    } else {
        record.total_work_minutes = totals.total_work_minutes as i32;
        record.overtime_minutes = totals.overtime_minutes as i32;
    }
}

/// The anomaly to report when a transition has just flagged `record` invalid.
fn newly_invalid(was_invalid: bool, record: &ClockRecord) -> Option<AppError> {
    (!was_invalid && record.is_invalid).then(|| {
        AppError::DataAnomaly(format!(
            "clock record {} for employee {} on {} has an impossible duration",
            record.id, record.employee_id, record.work_date
        ))
    })
}

// ─── Service ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClockEventRequest {
    pub employee_id: Uuid,
    /// Local date of the day's first clock-in.
    pub work_date: NaiveDate,
    pub event: ClockEvent,
    pub selfie_b64: String,
    pub gps: GpsFix,
    pub capture_source: CaptureSource,
    /// Server-assigned capture time.
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoCloseReport {
    pub closed: usize,
    pub busy: usize,
    pub errors: usize,
}

type RecordKey = (Uuid, NaiveDate);

pub struct AttendanceService {
    repo: Arc<dyn AttendanceRepository>,
    detector: Arc<dyn FaceDetector>,
    geocoder: Arc<dyn Geocoder>,
    config: AttendanceConfig,
    locks: DashMap<RecordKey, Arc<Mutex<()>>>,
}

impl AttendanceService {
    pub fn new(
        repo: Arc<dyn AttendanceRepository>,
        detector: Arc<dyn FaceDetector>,
        geocoder: Arc<dyn Geocoder>,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            repo,
            detector,
            geocoder,
            config,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: RecordKey) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().clone()
    }

    fn release(&self, key: &RecordKey, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(key, |_, m| Arc::strong_count(m) == 1);
    }

    /// Validates, applies and persists one clock event. Transitions for the
    /// same employee and day are serialised; a concurrent one gets StaleState.
    pub async fn record_clock_event(&self, req: ClockEventRequest) -> AppResult<ClockRecord> {
        req.gps.validate()?;

        // Decoding and the blur pass walk every pixel; keep them off the executor.
        let selfie = req.selfie_b64.clone();
        let source = req.capture_source;
        let detector = self.detector.clone();
        let face_cfg = self.config.face.clone();
        tokio::task::spawn_blocking(move || {
            check_selfie(&selfie, source, detector.as_ref(), &face_cfg)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Face check task failed: {e}")))??;

        let local = req
            .captured_at
            .with_timezone(&self.config.local_offset)
            .naive_local()
            .with_nanosecond(0)
            .unwrap_or_else(|| req.captured_at.naive_utc());

        // Best-effort, outside the lock.
        let address = match self.geocoder.reverse(req.gps).await {
            Ok(address) => address,
            Err(e) => {
                warn!("Reverse geocoding failed for employee {}: {}", req.employee_id, e);
                None
            }
        };

        let key = (req.employee_id, req.work_date);
        let lock = self.lock_for(key);
        let result = match lock.try_lock() {
            Ok(_guard) => self.apply_event(&req, local, address).await,
            Err(_) => Err(AppError::StaleState(format!(
                "Another clock event for employee {} on {} is in progress",
                req.employee_id, req.work_date
            ))),
        };
        self.release(&key, lock);
        result
    }

    async fn apply_event(
        &self,
        req: &ClockEventRequest,
        local: NaiveDateTime,
        address: Option<String>,
    ) -> AppResult<ClockRecord> {
        let existing = self
            .repo
            .find_clock_record(req.employee_id, req.work_date)
            .await?;
        let expected_version = existing.as_ref().map(|r| r.version);
        let mut record = existing
            .unwrap_or_else(|| ClockRecord::new(req.employee_id, req.work_date, req.captured_at));

        let state = AttendanceState::of(&record);
        let next = state.next(req.event)?;
        let was_invalid = record.is_invalid;

        if req.event == ClockEvent::ClockIn1 {
            if local.date() != req.work_date {
                return Err(AppError::Validation(format!(
                    "First clock-in at {local} does not fall on work date {}",
                    req.work_date
                )));
            }
            record.media_retention_eligible_at = Some(req.captured_at);
        } else {
            let Some((_, previous)) = project_timeline(&record).last().copied() else {
                return Err(AppError::Validation("Record has no clock-in".to_string()));
            };
            if local <= previous {
                return Err(AppError::Validation(format!(
                    "{} at {local} is not after the previous event at {previous}",
                    req.event
                )));
            }
            if local.date() > req.work_date + Duration::days(1) {
                return Err(AppError::Validation(format!(
                    "{} at {local} is outside work date {}",
                    req.event, req.work_date
                )));
            }
            if project_after(previous, local.time()) != local {
                // Stored wall-clock times can no longer express this span.
                warn!(
                    "Clock record {} flagged: {} at {local} is more than a day after {previous}",
                    record.id, req.event
                );
                record.is_invalid = true;
            }
        }

        record.record_capture(
            req.event,
            EventCapture {
                time: local.time(),
                location: req.gps.to_location(),
                photo: req.selfie_b64.clone(),
                face_detected: true,
                address,
            },
        );
        record.status = next.status();
        let totals = compute_daily_totals(&record, &self.config);
        apply_totals(&mut record, totals);
        record.updated_at = req.captured_at;

        if let Some(anomaly) = newly_invalid(was_invalid, &record) {
            warn!(kind = anomaly.kind(), "{}", anomaly);
        }

        let stored = self.repo.upsert_clock_record(&record, expected_version).await?;
        debug!(
            "Recorded {} for employee {} on {} (version {})",
            req.event, req.employee_id, req.work_date, stored.version
        );
        Ok(stored)
    }

    /// Closes records still open from days before `before`. Whatever sessions
    /// were completed are counted; a day with none is flagged invalid.
    pub async fn auto_close_open_records(
        &self,
        before: NaiveDate,
        limit: u32,
        now: DateTime<Utc>,
    ) -> AppResult<AutoCloseReport> {
        let open = self.repo.list_open_clock_records(before, limit).await?;
        let mut report = AutoCloseReport::default();

        for record in open {
            let key = (record.employee_id, record.work_date);
            let lock = self.lock_for(key);
            let outcome = match lock.try_lock() {
                Ok(_guard) => Some(self.close_record(record, now).await),
                Err(_) => None,
            };
            self.release(&key, lock);

            match outcome {
                Some(Ok(())) => report.closed += 1,
                Some(Err(e)) => {
                    warn!("Auto-close failed for {:?}: {}", key, e);
                    report.errors += 1;
                }
                None => report.busy += 1,
            }
        }

        info!(
            "Auto-closed {} records before {} ({} busy, {} errors)",
            report.closed, before, report.busy, report.errors
        );
        Ok(report)
    }

    async fn close_record(&self, mut record: ClockRecord, now: DateTime<Utc>) -> AppResult<()> {
        if !AttendanceState::of(&record).is_open() {
            return Ok(());
        }
        let expected_version = Some(record.version);
        let was_invalid = record.is_invalid;
        record.status = ClockStatus::AutoClosed;
        let totals = compute_daily_totals(&record, &self.config);
        apply_totals(&mut record, totals);
        record.updated_at = now;

        if let Some(anomaly) = newly_invalid(was_invalid, &record) {
            warn!(kind = anomaly.kind(), "{}", anomaly);
        }
        self.repo.upsert_clock_record(&record, expected_version).await?;
        Ok(())
    }
}
