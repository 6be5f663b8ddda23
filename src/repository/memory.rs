// src/repository/memory.rs

use super::{AttendanceRepository, PayrollRepository, RetentionRepository};
use crate::{
    errors::{AppError, AppResult},
    models::{
        Advance, AdvanceStatus, ClockRecord, ClockStatus, PayrollItemRecord, PayrollRun,
        RetentionLog,
    },
    services::retention::ComplianceSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Process-local store with the same semantics as [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    clock_records: Mutex<HashMap<Uuid, ClockRecord>>,
    retention_logs: Mutex<Vec<RetentionLog>>,
    payroll_runs: Mutex<HashMap<Uuid, PayrollRun>>,
    payroll_items: Mutex<HashMap<Uuid, PayrollItemRecord>>,
    advances: Mutex<HashMap<Uuid, Advance>>,
    failing_records: Mutex<HashSet<Uuid>>,
    failing_advances: Mutex<HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` as-is, bypassing version checks.
    pub fn put_clock_record(&self, record: ClockRecord) {
        self.clock_records.lock().insert(record.id, record);
    }

    pub fn clock_record(&self, id: Uuid) -> Option<ClockRecord> {
        self.clock_records.lock().get(&id).cloned()
    }

    pub fn retention_logs(&self) -> Vec<RetentionLog> {
        self.retention_logs.lock().clone()
    }

    pub fn put_advance(&self, advance: Advance) {
        self.advances.lock().insert(advance.id, advance);
    }

    pub fn advance(&self, id: Uuid) -> Option<Advance> {
        self.advances.lock().get(&id).cloned()
    }

    /// Makes every later media clear on `id` fail with a store error.
    pub fn fail_media_clear_for(&self, id: Uuid) {
        self.failing_records.lock().insert(id);
    }

    /// Makes every later write to advance `id` fail with a store error.
    pub fn fail_advance_update_for(&self, id: Uuid) {
        self.failing_advances.lock().insert(id);
    }

    fn check_advance_failure(&self, id: Uuid) -> AppResult<()> {
        if self.failing_advances.lock().contains(&id) {
            return Err(AppError::Store(format!("Injected failure for advance {id}")));
        }
        Ok(())
    }

    fn check_failure(&self, id: Uuid) -> AppResult<()> {
        if self.failing_records.lock().contains(&id) {
            return Err(AppError::Store(format!("Injected failure for record {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn find_clock_record(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<ClockRecord>> {
        Ok(self
            .clock_records
            .lock()
            .values()
            .find(|r| r.employee_id == employee_id && r.work_date == work_date)
            .cloned())
    }

    async fn upsert_clock_record(
        &self,
        record: &ClockRecord,
        expected_version: Option<i32>,
    ) -> AppResult<ClockRecord> {
        let mut records = self.clock_records.lock();
        let current = records
            .values()
            .find(|r| r.employee_id == record.employee_id && r.work_date == record.work_date)
            .map(|r| (r.id, r.version));

        match (current, expected_version) {
            (None, None) => {}
            (Some((id, version)), Some(expected)) if id == record.id && version == expected => {}
            _ => {
                return Err(AppError::StaleState(format!(
                    "Clock record for employee {} on {} changed concurrently",
                    record.employee_id, record.work_date
                )));
            }
        }

        let mut stored = record.clone();
        stored.version = expected_version.map_or(1, |v| v + 1);
        records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_open_clock_records(
        &self,
        before: NaiveDate,
        limit: u32,
    ) -> AppResult<Vec<ClockRecord>> {
        let mut open: Vec<ClockRecord> = self
            .clock_records
            .lock()
            .values()
            .filter(|r| r.work_date < before)
            .filter(|r| matches!(r.status, ClockStatus::Working | ClockStatus::OnBreak))
            .cloned()
            .collect();
        open.sort_by_key(|r| (r.work_date, r.id));
        open.truncate(limit as usize);
        Ok(open)
    }
}

#[async_trait]
impl RetentionRepository for MemoryStore {
    async fn list_eligible_for_retention(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ClockRecord>> {
        let mut eligible: Vec<ClockRecord> = self
            .clock_records
            .lock()
            .values()
            .filter(|r| r.media_deleted_at.is_none() && r.has_media())
            .filter(|r| r.media_retention_eligible_at.is_some_and(|at| at <= cutoff))
            .cloned()
            .collect();
        eligible.sort_by_key(|r| (r.media_retention_eligible_at, r.id));
        Ok(eligible
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn clear_media(&self, id: Uuid, fields: &[String], at: DateTime<Utc>) -> AppResult<bool> {
        self.check_failure(id)?;
        let mut records = self.clock_records.lock();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Clock record {id}")))?;
        if record.media_deleted_at.is_some() {
            return Ok(false);
        }
        record.clear_media(fields, at)?;
        Ok(true)
    }

    async fn append_retention_log(&self, entry: &RetentionLog) -> AppResult<()> {
        self.retention_logs.lock().push(entry.clone());
        Ok(())
    }

    async fn clear_media_with_log(
        &self,
        id: Uuid,
        fields: &[String],
        at: DateTime<Utc>,
        entry: &RetentionLog,
    ) -> AppResult<bool> {
        self.check_failure(id)?;
        let mut records = self.clock_records.lock();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Clock record {id}")))?;
        if record.media_deleted_at.is_some() {
            return Ok(false);
        }
        // Validate on a copy so a bad field name leaves nothing half-cleared.
        let mut cleared = record.clone();
        cleared.clear_media(fields, at)?;
        *record = cleared;
        self.retention_logs.lock().push(entry.clone());
        Ok(true)
    }

    async fn retention_summary(
        &self,
        soft_cutoff: DateTime<Utc>,
        hard_cutoff: DateTime<Utc>,
    ) -> AppResult<ComplianceSummary> {
        let records = self.clock_records.lock();
        let mut summary = ComplianceSummary::default();
        for r in records.values() {
            let cleared = r.media_deleted_at.is_some();
            let holding = !cleared && r.has_media();
            if !cleared && !holding {
                continue;
            }
            summary.total += 1;
            if cleared {
                summary.completed += 1;
                continue;
            }
            if let Some(at) = r.media_retention_eligible_at {
                if at <= soft_cutoff {
                    summary.pending += 1;
                }
                if at <= hard_cutoff {
                    summary.overdue += 1;
                }
            }
        }
        Ok(summary)
    }
}

#[async_trait]
impl PayrollRepository for MemoryStore {
    async fn find_payroll_run(
        &self,
        organization_id: Uuid,
        year: i32,
        month: i32,
    ) -> AppResult<Option<PayrollRun>> {
        Ok(self
            .payroll_runs
            .lock()
            .values()
            .find(|r| r.organization_id == organization_id && r.year == year && r.month == month)
            .cloned())
    }

    async fn get_payroll_run(&self, id: Uuid) -> AppResult<Option<PayrollRun>> {
        Ok(self.payroll_runs.lock().get(&id).cloned())
    }

    async fn insert_payroll_run(&self, run: &PayrollRun) -> AppResult<()> {
        let mut runs = self.payroll_runs.lock();
        if runs.values().any(|r| {
            r.organization_id == run.organization_id && r.year == run.year && r.month == run.month
        }) {
            return Err(AppError::Conflict(format!(
                "Payroll run for {}-{:02} already exists",
                run.year, run.month
            )));
        }
        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn update_payroll_run(&self, run: &PayrollRun) -> AppResult<()> {
        let mut runs = self.payroll_runs.lock();
        let slot = runs
            .get_mut(&run.id)
            .ok_or_else(|| AppError::NotFound(format!("Payroll run {}", run.id)))?;
        *slot = run.clone();
        Ok(())
    }

    async fn find_payroll_items(
        &self,
        employee_id: Uuid,
        year: i32,
        up_to_month: i32,
    ) -> AppResult<Vec<PayrollItemRecord>> {
        let mut items: Vec<PayrollItemRecord> = self
            .payroll_items
            .lock()
            .values()
            .filter(|r| {
                r.item.employee_id == employee_id
                    && r.item.year == year
                    && r.item.month <= up_to_month
            })
            .cloned()
            .collect();
        items.sort_by_key(|r| r.item.month);
        Ok(items)
    }

    async fn insert_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()> {
        self.insert_payroll_item_with_advances(record, &[]).await
    }

    async fn insert_payroll_item_with_advances(
        &self,
        record: &PayrollItemRecord,
        advances: &[Advance],
    ) -> AppResult<()> {
        // Both maps stay locked until every check has passed.
        let mut items = self.payroll_items.lock();
        let mut stored = self.advances.lock();
        if items.values().any(|r| {
            r.item.employee_id == record.item.employee_id
                && r.item.year == record.item.year
                && r.item.month == record.item.month
        }) {
            return Err(AppError::Conflict(format!(
                "Employee {} already has a payroll item for {}-{:02}",
                record.item.employee_id, record.item.year, record.item.month
            )));
        }
        for advance in advances {
            self.check_advance_failure(advance.id)?;
            if !stored.contains_key(&advance.id) {
                return Err(AppError::NotFound(format!("Advance {}", advance.id)));
            }
        }

        items.insert(record.id, record.clone());
        for advance in advances {
            stored.insert(advance.id, advance.clone());
        }
        Ok(())
    }

    async fn update_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()> {
        let mut items = self.payroll_items.lock();
        let slot = items
            .get_mut(&record.id)
            .ok_or_else(|| AppError::NotFound(format!("Payroll item {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    async fn list_active_advances(&self, employee_id: Uuid) -> AppResult<Vec<Advance>> {
        let mut advances: Vec<Advance> = self
            .advances
            .lock()
            .values()
            .filter(|a| a.employee_id == employee_id && a.status == AdvanceStatus::Active)
            .cloned()
            .collect();
        advances.sort_by_key(|a| a.created_at);
        Ok(advances)
    }

    async fn update_advance(&self, advance: &Advance) -> AppResult<()> {
        self.check_advance_failure(advance.id)?;
        let mut stored = self.advances.lock();
        let slot = stored
            .get_mut(&advance.id)
            .ok_or_else(|| AppError::NotFound(format!("Advance {}", advance.id)))?;
        *slot = advance.clone();
        Ok(())
    }
}
