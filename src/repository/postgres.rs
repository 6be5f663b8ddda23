// src/repository/postgres.rs

use super::{AttendanceRepository, PayrollRepository, RetentionRepository};
use crate::{
    errors::{AppError, AppResult},
    models::{Advance, ClockRecord, MEDIA_FIELDS, PayrollItemRecord, PayrollRun, RetentionLog},
    services::retention::ComplianceSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const HAS_MEDIA: &str = "COALESCE(photo_in_1, photo_out_1, photo_in_2, photo_out_2, \
     address_in_1, address_out_1, address_in_2, address_out_2) IS NOT NULL";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `SET photo_in_1 = NULL, ...` for whitelisted media columns only.
fn media_set_clause(fields: &[String]) -> AppResult<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        if !MEDIA_FIELDS.contains(&field.as_str()) {
            return Err(AppError::Validation(format!("Not a media field: {field}")));
        }
        parts.push(format!("{field} = NULL"));
    }
    Ok(parts.join(", "))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn clear_media_in(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    fields: &[String],
    at: DateTime<Utc>,
) -> AppResult<bool> {
    let mut set = media_set_clause(fields)?;
    if !set.is_empty() {
        set.push_str(", ");
    }
    let sql = format!(
        "UPDATE clock_records SET {set}media_deleted_at = $2, updated_at = $2 \
         WHERE id = $1 AND media_deleted_at IS NULL"
    );
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(at)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() == 1)
}

async fn append_log_in(tx: &mut Transaction<'_, Postgres>, entry: &RetentionLog) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO retention_logs (id, clock_record_id, cleared_fields, cleared_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.id)
    .bind(entry.clock_record_id)
    .bind(&entry.cleared_fields)
    .bind(entry.cleared_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_item_in(tx: &mut Transaction<'_, Postgres>, record: &PayrollItemRecord) -> AppResult<()> {
    let i = &record.item;
    let e = &i.earnings;
    sqlx::query(
        r#"INSERT INTO payroll_items (
            id, payroll_run_id, employee_id, year, month,
            basic, commission, fixed_allowance, overtime_amount, bonus, incentive, claims,
            advance_deducted, unpaid_leave_deduction, other_deductions, zakat,
            gross, statutory_base, epf_ee, epf_er, socso_ee, socso_er, eis_ee, eis_er, pcb,
            total_employee_deductions, total_employer_contributions, net, ytd_snapshot,
            created_at, updated_at
        ) VALUES (
            $1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,
            $17,$18,$19,$20,$21,$22,$23,$24,$25,$26,$27,$28,$29,$30,$31
        )"#,
    )
    .bind(record.id)
    .bind(record.payroll_run_id)
    .bind(i.employee_id)
    .bind(i.year)
    .bind(i.month)
    .bind(e.basic)
    .bind(e.commission)
    .bind(e.fixed_allowance)
    .bind(e.overtime_amount)
    .bind(e.bonus)
    .bind(e.incentive)
    .bind(e.claims)
    .bind(e.advance_deducted)
    .bind(e.unpaid_leave_deduction)
    .bind(e.other_deductions)
    .bind(e.zakat)
    .bind(i.gross)
    .bind(i.statutory_base)
    .bind(i.epf_ee)
    .bind(i.epf_er)
    .bind(i.socso_ee)
    .bind(i.socso_er)
    .bind(i.eis_ee)
    .bind(i.eis_er)
    .bind(i.pcb)
    .bind(i.total_employee_deductions)
    .bind(i.total_employer_contributions)
    .bind(i.net)
    .bind(&i.ytd_snapshot)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            return AppError::Conflict(format!(
                "Employee {} already has a payroll item for {}-{:02}",
                i.employee_id, i.year, i.month
            ));
        }
        AppError::Database(err)
    })?;
    Ok(())
}

async fn update_advance_in(tx: &mut Transaction<'_, Postgres>, advance: &Advance) -> AppResult<()> {
    let result =
        sqlx::query("UPDATE advances SET remaining_balance = $2, status = $3 WHERE id = $1")
            .bind(advance.id)
            .bind(advance.remaining_balance)
            .bind(advance.status)
            .execute(&mut **tx)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Advance {}", advance.id)));
    }
    Ok(())
}

// ─── Attendance ───────────────────────────────────────────────────────────────

#[async_trait]
impl AttendanceRepository for PgStore {
    async fn find_clock_record(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<ClockRecord>> {
        let record = sqlx::query_as::<_, ClockRecord>(
            "SELECT * FROM clock_records WHERE employee_id = $1 AND work_date = $2",
        )
        .bind(employee_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn upsert_clock_record(
        &self,
        record: &ClockRecord,
        expected_version: Option<i32>,
    ) -> AppResult<ClockRecord> {
        let stored = match expected_version {
            None => {
                sqlx::query_as::<_, ClockRecord>(
                    r#"INSERT INTO clock_records (
                        id, employee_id, work_date,
                        clock_in_1, clock_out_1, clock_in_2, clock_out_2,
                        location_in_1, location_out_1, location_in_2, location_out_2,
                        photo_in_1, photo_out_1, photo_in_2, photo_out_2,
                        face_detected_in_1, face_detected_out_1, face_detected_in_2, face_detected_out_2,
                        address_in_1, address_out_1, address_in_2, address_out_2,
                        total_work_minutes, overtime_minutes, is_invalid, status, version,
                        media_retention_eligible_at, media_deleted_at, created_at, updated_at
                    ) VALUES (
                        $1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,
                        $17,$18,$19,$20,$21,$22,$23,$24,$25,$26,$27,1,$28,$29,$30,$31
                    )
                    ON CONFLICT (employee_id, work_date) DO NOTHING
                    RETURNING *"#,
                )
                .bind(record.id)
                .bind(record.employee_id)
                .bind(record.work_date)
                .bind(record.clock_in_1)
                .bind(record.clock_out_1)
                .bind(record.clock_in_2)
                .bind(record.clock_out_2)
                .bind(&record.location_in_1)
                .bind(&record.location_out_1)
                .bind(&record.location_in_2)
                .bind(&record.location_out_2)
                .bind(&record.photo_in_1)
                .bind(&record.photo_out_1)
                .bind(&record.photo_in_2)
                .bind(&record.photo_out_2)
                .bind(record.face_detected_in_1)
                .bind(record.face_detected_out_1)
                .bind(record.face_detected_in_2)
                .bind(record.face_detected_out_2)
                .bind(&record.address_in_1)
                .bind(&record.address_out_1)
                .bind(&record.address_in_2)
                .bind(&record.address_out_2)
                .bind(record.total_work_minutes)
                .bind(record.overtime_minutes)
                .bind(record.is_invalid)
                .bind(record.status)
                .bind(record.media_retention_eligible_at)
                .bind(record.media_deleted_at)
                .bind(record.created_at)
                .bind(record.updated_at)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query_as::<_, ClockRecord>(
                    r#"UPDATE clock_records SET
                        clock_in_1 = $3, clock_out_1 = $4, clock_in_2 = $5, clock_out_2 = $6,
                        location_in_1 = $7, location_out_1 = $8, location_in_2 = $9, location_out_2 = $10,
                        photo_in_1 = $11, photo_out_1 = $12, photo_in_2 = $13, photo_out_2 = $14,
                        face_detected_in_1 = $15, face_detected_out_1 = $16,
                        face_detected_in_2 = $17, face_detected_out_2 = $18,
                        address_in_1 = $19, address_out_1 = $20, address_in_2 = $21, address_out_2 = $22,
                        total_work_minutes = $23, overtime_minutes = $24, is_invalid = $25, status = $26,
                        media_retention_eligible_at = $27, updated_at = $28,
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    RETURNING *"#,
                )
                .bind(record.id)
                .bind(expected)
                .bind(record.clock_in_1)
                .bind(record.clock_out_1)
                .bind(record.clock_in_2)
                .bind(record.clock_out_2)
                .bind(&record.location_in_1)
                .bind(&record.location_out_1)
                .bind(&record.location_in_2)
                .bind(&record.location_out_2)
                .bind(&record.photo_in_1)
                .bind(&record.photo_out_1)
                .bind(&record.photo_in_2)
                .bind(&record.photo_out_2)
                .bind(record.face_detected_in_1)
                .bind(record.face_detected_out_1)
                .bind(record.face_detected_in_2)
                .bind(record.face_detected_out_2)
                .bind(&record.address_in_1)
                .bind(&record.address_out_1)
                .bind(&record.address_in_2)
                .bind(&record.address_out_2)
                .bind(record.total_work_minutes)
                .bind(record.overtime_minutes)
                .bind(record.is_invalid)
                .bind(record.status)
                .bind(record.media_retention_eligible_at)
                .bind(record.updated_at)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        stored.ok_or_else(|| {
            AppError::StaleState(format!(
                "Clock record for employee {} on {} changed concurrently",
                record.employee_id, record.work_date
            ))
        })
    }

    async fn list_open_clock_records(
        &self,
        before: NaiveDate,
        limit: u32,
    ) -> AppResult<Vec<ClockRecord>> {
        let records = sqlx::query_as::<_, ClockRecord>(
            "SELECT * FROM clock_records \
             WHERE work_date < $1 AND status IN ('working', 'on_break') \
             ORDER BY work_date, id LIMIT $2",
        )
        .bind(before)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

// ─── Retention ────────────────────────────────────────────────────────────────

#[async_trait]
impl RetentionRepository for PgStore {
    async fn list_eligible_for_retention(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ClockRecord>> {
        let sql = format!(
            "SELECT * FROM clock_records \
             WHERE media_deleted_at IS NULL AND media_retention_eligible_at <= $1 AND {HAS_MEDIA} \
             ORDER BY media_retention_eligible_at, id LIMIT $2 OFFSET $3"
        );
        let records = sqlx::query_as::<_, ClockRecord>(&sql)
            .bind(cutoff)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn clear_media(&self, id: Uuid, fields: &[String], at: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let cleared = clear_media_in(&mut tx, id, fields, at).await?;
        tx.commit().await?;
        Ok(cleared)
    }

    async fn append_retention_log(&self, entry: &RetentionLog) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        append_log_in(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear_media_with_log(
        &self,
        id: Uuid,
        fields: &[String],
        at: DateTime<Utc>,
        entry: &RetentionLog,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        if !clear_media_in(&mut tx, id, fields, at).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        append_log_in(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn retention_summary(
        &self,
        soft_cutoff: DateTime<Utc>,
        hard_cutoff: DateTime<Utc>,
    ) -> AppResult<ComplianceSummary> {
        let sql = format!(
            "SELECT \
               COUNT(*) FILTER (WHERE media_deleted_at IS NOT NULL OR {HAS_MEDIA}), \
               COUNT(*) FILTER (WHERE media_deleted_at IS NULL AND {HAS_MEDIA} \
                                AND media_retention_eligible_at <= $1), \
               COUNT(*) FILTER (WHERE media_deleted_at IS NULL AND {HAS_MEDIA} \
                                AND media_retention_eligible_at <= $2), \
               COUNT(*) FILTER (WHERE media_deleted_at IS NOT NULL) \
             FROM clock_records"
        );
        let (total, pending, overdue, completed) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(&sql)
                .bind(soft_cutoff)
                .bind(hard_cutoff)
                .fetch_one(&self.pool)
                .await?;
        let count = |n: i64| u64::try_from(n).unwrap_or(0);
        Ok(ComplianceSummary {
            total: count(total),
            pending: count(pending),
            overdue: count(overdue),
            completed: count(completed),
        })
    }
}

// ─── Payroll ──────────────────────────────────────────────────────────────────

#[async_trait]
impl PayrollRepository for PgStore {
    async fn find_payroll_run(
        &self,
        organization_id: Uuid,
        year: i32,
        month: i32,
    ) -> AppResult<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>(
            "SELECT * FROM payroll_runs WHERE organization_id = $1 AND year = $2 AND month = $3",
        )
        .bind(organization_id)
        .bind(year)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }

    async fn get_payroll_run(&self, id: Uuid) -> AppResult<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>("SELECT * FROM payroll_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(run)
    }

    async fn insert_payroll_run(&self, run: &PayrollRun) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO payroll_runs (id, organization_id, year, month, status, created_at, finalised_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(run.id)
        .bind(run.organization_id)
        .bind(run.year)
        .bind(run.month)
        .bind(run.status)
        .bind(run.created_at)
        .bind(run.finalised_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict(format!(
                    "Payroll run for {}-{:02} already exists",
                    run.year, run.month
                ));
            }
            AppError::Database(e)
        })?;
        Ok(())
    }

    async fn update_payroll_run(&self, run: &PayrollRun) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE payroll_runs SET status = $2, finalised_at = $3 WHERE id = $1",
        )
        .bind(run.id)
        .bind(run.status)
        .bind(run.finalised_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Payroll run {}", run.id)));
        }
        Ok(())
    }

    async fn find_payroll_items(
        &self,
        employee_id: Uuid,
        year: i32,
        up_to_month: i32,
    ) -> AppResult<Vec<PayrollItemRecord>> {
        let items = sqlx::query_as::<_, PayrollItemRecord>(
            "SELECT * FROM payroll_items \
             WHERE employee_id = $1 AND year = $2 AND month <= $3 ORDER BY month",
        )
        .bind(employee_id)
        .bind(year)
        .bind(up_to_month)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn insert_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_item_in(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_payroll_item_with_advances(
        &self,
        record: &PayrollItemRecord,
        advances: &[Advance],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_item_in(&mut tx, record).await?;
        for advance in advances {
            update_advance_in(&mut tx, advance).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_payroll_item(&self, record: &PayrollItemRecord) -> AppResult<()> {
        let i = &record.item;
        let e = &i.earnings;
        let result = sqlx::query(
            r#"UPDATE payroll_items SET
                basic = $2, commission = $3, fixed_allowance = $4, overtime_amount = $5,
                bonus = $6, incentive = $7, claims = $8, advance_deducted = $9,
                unpaid_leave_deduction = $10, other_deductions = $11, zakat = $12,
                gross = $13, statutory_base = $14, epf_ee = $15, epf_er = $16,
                socso_ee = $17, socso_er = $18, eis_ee = $19, eis_er = $20, pcb = $21,
                total_employee_deductions = $22, total_employer_contributions = $23,
                net = $24, ytd_snapshot = $25, updated_at = $26
            WHERE id = $1"#,
        )
        .bind(record.id)
        .bind(e.basic)
        .bind(e.commission)
        .bind(e.fixed_allowance)
        .bind(e.overtime_amount)
        .bind(e.bonus)
        .bind(e.incentive)
        .bind(e.claims)
        .bind(e.advance_deducted)
        .bind(e.unpaid_leave_deduction)
        .bind(e.other_deductions)
        .bind(e.zakat)
        .bind(i.gross)
        .bind(i.statutory_base)
        .bind(i.epf_ee)
        .bind(i.epf_er)
        .bind(i.socso_ee)
        .bind(i.socso_er)
        .bind(i.eis_ee)
        .bind(i.eis_er)
        .bind(i.pcb)
        .bind(i.total_employee_deductions)
        .bind(i.total_employer_contributions)
        .bind(i.net)
        .bind(&i.ytd_snapshot)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Payroll item {}", record.id)));
        }
        Ok(())
    }

    async fn list_active_advances(&self, employee_id: Uuid) -> AppResult<Vec<Advance>> {
        let advances = sqlx::query_as::<_, Advance>(
            "SELECT * FROM advances WHERE employee_id = $1 AND status = 'active' ORDER BY created_at",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(advances)
    }

    async fn update_advance(&self, advance: &Advance) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        update_advance_in(&mut tx, advance).await?;
        tx.commit().await?;
        Ok(())
    }
}
