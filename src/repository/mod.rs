// src/repository/mod.rs
//
// Persistence seams. The services only see these traits; Postgres backs them
// in production and the in-memory store backs tests and embedding.

pub mod memory;
pub mod postgres;

use crate::{
    errors::AppResult,
    models::{Advance, ClockRecord, PayrollItemRecord, PayrollRun, RetentionLog},
    services::retention::ComplianceSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_clock_record(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<ClockRecord>>;

    /// Inserts (`expected_version = None`) or replaces the record, bumping
    /// its version. Fails with StaleState when the stored version moved on,
    /// or when another writer created the record first.
    async fn upsert_clock_record(
        &self,
        record: &ClockRecord,
        expected_version: Option<i32>,
    ) -> AppResult<ClockRecord>;

    /// Records still working or on break from days before `before`.
    async fn list_open_clock_records(
        &self,
        before: NaiveDate,
        limit: u32,
    ) -> AppResult<Vec<ClockRecord>>;
}

#[async_trait]
pub trait RetentionRepository: Send + Sync {
    /// Records with media, not yet cleared, eligible at or before `cutoff`,
    /// oldest first.
    async fn list_eligible_for_retention(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ClockRecord>>;

    /// Nulls `fields` and stamps `media_deleted_at`. Returns false when the
    /// record was already cleared.
    async fn clear_media(&self, id: Uuid, fields: &[String], at: DateTime<Utc>) -> AppResult<bool>;

    async fn append_retention_log(&self, entry: &RetentionLog) -> AppResult<()>;

    /// Clear and log as one unit. Stores with transactions must override this.
    async fn clear_media_with_log(
        &self,
        id: Uuid,
        fields: &[String],
        at: DateTime<Utc>,
        entry: &RetentionLog,
    ) -> AppResult<bool> {
        if !self.clear_media(id, fields, at).await? {
            return Ok(false);
        }
        self.append_retention_log(entry).await?;
        Ok(true)
    }

    async fn retention_summary(
        &self,
        soft_cutoff: DateTime<Utc>,
        hard_cutoff: DateTime<Utc>,
    ) -> AppResult<ComplianceSummary>;
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    async fn find_payroll_run(
        &self,
        organization_id: Uuid,
        year: i32,
        month: i32,
    ) -> AppResult<Option<PayrollRun>>;

    async fn get_payroll_run(&self, id: Uuid) -> AppResult<Option<PayrollRun>>;

    async fn insert_payroll_run(&self, run: &PayrollRun) -> AppResult<()>;

    async fn update_payroll_run(&self, run: &PayrollRun) -> AppResult<()>;

    /// Items for `employee_id` in `year` with month `<= up_to_month`,
    /// ordered by month.
    async fn find_payroll_items(
        &self,
        employee_id: Uuid,
        year: i32,
        up_to_month: i32,
    ) -> AppResult<Vec<PayrollItemRecord>>;

    async fn insert_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()>;

    async fn update_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()>;

    async fn list_active_advances(&self, employee_id: Uuid) -> AppResult<Vec<Advance>>;

    async fn update_advance(&self, advance: &Advance) -> AppResult<()>;

    /// Stores a payroll item together with the advance balances it deducted
    /// from. Stores with transactions must override this.
    async fn insert_payroll_item_with_advances(
        &self,
        record: &PayrollItemRecord,
        advances: &[Advance],
    ) -> AppResult<()> {
        self.insert_payroll_item(record).await?;
        for advance in advances {
            self.update_advance(advance).await?;
        }
        Ok(())
    }
}
