// src/services/payroll.rs

use crate::{
    config::Ruleset,
    errors::{AppError, AppResult},
    identity,
    models::{
        Advance, AdvanceStatus, Earnings, Employee, PayrollItem, PayrollItemRecord, PayrollRun,
        PayrollStatus, YtdAccumulators,
    },
    money::{non_negative, round_half_up},
    repository::PayrollRepository,
    rules::working_days_in_month,
    services::{
        contributions::{
            ContributionInput, compute_contributions, epf_employee_share, relief_contributions,
        },
        pcb::{PcbInput, compute_pcb},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct PayrollService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub year: i32,
    pub month: u32,
}

impl PayPeriod {
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("Invalid payroll month: {month}")));
        }
        Ok(Self { year, month })
    }

    fn of_item(item: &PayrollItem) -> AppResult<Self> {
        let month = u32::try_from(item.month)
            .map_err(|_| AppError::Validation(format!("Invalid payroll month: {}", item.month)))?;
        Self::new(item.year, month)
    }

    /// Ages are taken on the first day of the period.
    pub fn first_day(&self) -> AppResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            AppError::Validation(format!("Invalid pay period {}-{:02}", self.year, self.month))
        })
    }
}

/// What the payroll clerk enters for one employee-month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyInput {
    /// Part-time only.
    pub hours_worked: Decimal,
    pub overtime_hours: Decimal,
    pub public_holiday_days: Decimal,
    pub commission: Decimal,
    pub fixed_allowance: Decimal,
    pub bonus: Decimal,
    pub incentive: Decimal,
    pub claims: Decimal,
    pub unpaid_leave_deduction: Decimal,
    pub other_deductions: Decimal,
    pub zakat: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayrollRunReport {
    pub run: PayrollRun,
    pub items: Vec<PayrollItem>,
    /// Employees skipped, with the reason.
    pub failures: Vec<(Uuid, String)>,
    pub total_gross: Decimal,
    pub total_net: Decimal,
}

impl PayrollService {
    /// Rate used for overtime and, for part-timers, for the wage itself.
    pub fn hourly_rate(employee: &Employee, period: PayPeriod, rules: &Ruleset) -> AppResult<Decimal> {
        if employee.is_part_time() {
            return employee.hourly_rate.ok_or_else(|| {
                AppError::Validation(format!("Part-time employee {} has no hourly rate", employee.id))
            });
        }
        let days = working_days_in_month(period.year, period.month);
        if days == 0 {
            return Err(AppError::Validation(format!(
                "No working days in {}-{:02}",
                period.year, period.month
            )));
        }
        Ok(employee.basic_salary / Decimal::from(days) / rules.standard_hours_per_day)
    }

    /// Turns clerk input into the earnings decomposition. Overtime pay covers
    /// both extra hours and public holidays worked.
    pub fn resolve_earnings(
        employee: &Employee,
        period: PayPeriod,
        input: &MonthlyInput,
        advance_deducted: Decimal,
        rules: &Ruleset,
    ) -> AppResult<Earnings> {
        let hourly = Self::hourly_rate(employee, period, rules)?;
        let daily = hourly * rules.standard_hours_per_day;

        let basic = if employee.is_part_time() {
            round_half_up(input.hours_worked * hourly)
        } else {
            employee.basic_salary
        };
        let overtime = input.overtime_hours * hourly * rules.ot_multiplier
            + input.public_holiday_days * daily * rules.ph_multiplier;

        let earnings = Earnings {
            basic,
            commission: input.commission,
            fixed_allowance: input.fixed_allowance,
            overtime_amount: round_half_up(overtime),
            bonus: input.bonus,
            incentive: input.incentive,
            claims: input.claims,
            advance_deducted,
            unpaid_leave_deduction: input.unpaid_leave_deduction,
            other_deductions: input.other_deductions,
            zakat: input.zakat,
        };
        earnings.validate()?;
        Ok(earnings)
    }

    /// Full payroll line for one employee-month. Pure: same inputs, same item.
    pub fn compute_payroll_item(
        employee: &Employee,
        period: PayPeriod,
        earnings: &Earnings,
        ytd: &YtdAccumulators,
        rules: &Ruleset,
    ) -> AppResult<PayrollItem> {
        employee.validate()?;
        earnings.validate()?;

        let person = identity::profile(&employee.id_number, employee.date_of_birth, period.first_day()?);
        let statutory_base = earnings.basic + earnings.commission + earnings.bonus;
        let contribution_wage =
            statutory_base + earnings.fixed_allowance + earnings.overtime_amount;
        let gross = round_half_up(
            contribution_wage + earnings.incentive + earnings.claims,
        );

        let contributions = compute_contributions(
            &ContributionInput {
                statutory_base,
                gross_wage: contribution_wage,
                age: person.age,
                resident_status: person.resident_status,
            },
            rules,
        );

        let epf_on_normal = epf_employee_share(
            earnings.basic,
            statutory_base,
            person.age,
            person.resident_status,
            rules,
        )
        .min(contributions.epf.ee);
        let (socso_relief, eis_relief) =
            relief_contributions(contribution_wage, person.age, person.resident_status, rules);

        let pcb = compute_pcb(
            &PcbInput {
                month: period.month,
                normal_remuneration: earnings.basic,
                additional_remuneration: earnings.commission + earnings.bonus,
                epf_on_normal,
                epf_on_additional: contributions.epf.ee - epf_on_normal,
                ytd: *ytd,
                current_zakat: earnings.zakat,
                marital_status: employee.marital_status,
                spouse_working: employee.spouse_working,
                children: u32::try_from(employee.children_count).unwrap_or(0),
                disabled: employee.disabled,
                spouse_disabled: employee.spouse_disabled,
                socso_relief,
                eis_relief,
            },
            rules,
        )
        .pcb;

        let total_employee_deductions = contributions.employee_total()
            + pcb
            + earnings.unpaid_leave_deduction
            + earnings.other_deductions
            + earnings.advance_deducted;
        let net = non_negative(round_half_up(gross - total_employee_deductions));

        Ok(PayrollItem {
            employee_id: employee.id,
            year: period.year,
            month: period.month as i32,
            earnings: earnings.clone(),
            gross,
            statutory_base,
            epf_ee: contributions.epf.ee,
            epf_er: contributions.epf.er,
            socso_ee: contributions.socso.ee,
            socso_er: contributions.socso.er,
            eis_ee: contributions.eis.ee,
            eis_er: contributions.eis.er,
            pcb,
            total_employee_deductions,
            total_employer_contributions: contributions.employer_total(),
            net,
            ytd_snapshot: Json(*ytd),
        })
    }

    /// Computes and stores a draft run for every employee in `inputs`. YTD is
    /// read for all employees before anything is written.
    pub async fn run_payroll(
        repo: &dyn PayrollRepository,
        organization_id: Uuid,
        period: PayPeriod,
        inputs: &[(Employee, MonthlyInput)],
        rules: &Ruleset,
        now: DateTime<Utc>,
    ) -> AppResult<PayrollRunReport> {
        if let Some(existing) = repo
            .find_payroll_run(organization_id, period.year, period.month as i32)
            .await?
        {
            return Err(match existing.status {
                PayrollStatus::Finalised => AppError::PayrollFinalised(existing.id.to_string()),
                PayrollStatus::Draft => AppError::Conflict(format!(
                    "Payroll for {}-{:02} already exists as run {}",
                    period.year, period.month, existing.id
                )),
            });
        }

        let mut snapshots = Vec::with_capacity(inputs.len());
        for (employee, _) in inputs {
            let prior = repo
                .find_payroll_items(employee.id, period.year, period.month as i32 - 1)
                .await?;
            snapshots.push(ytd_from_items(prior.iter().map(|r| &r.item), period));
        }

        let run = PayrollRun {
            id: Uuid::new_v4(),
            organization_id,
            year: period.year,
            month: period.month as i32,
            status: PayrollStatus::Draft,
            created_at: now,
            finalised_at: None,
        };
        repo.insert_payroll_run(&run).await?;
        info!(
            "Starting payroll run {} for org {} ({}-{:02}), {} employees",
            run.id,
            organization_id,
            period.year,
            period.month,
            inputs.len()
        );

        let mut report = PayrollRunReport {
            run,
            items: Vec::with_capacity(inputs.len()),
            failures: Vec::new(),
            total_gross: dec!(0),
            total_net: dec!(0),
        };

        for ((employee, input), ytd) in inputs.iter().zip(snapshots) {
            match Self::pay_employee(repo, report.run.id, employee, period, input, &ytd, rules, now)
                .await
            {
                Ok(item) => {
                    report.total_gross += item.gross;
                    report.total_net += item.net;
                    report.items.push(item);
                }
                Err(e) => {
                    error!("Payroll failed for employee {}: {}", employee.id, e);
                    report.failures.push((employee.id, e.to_string()));
                }
            }
        }

        info!(
            "Payroll run {} drafted. {} items, {} failures. Total net: RM{}",
            report.run.id,
            report.items.len(),
            report.failures.len(),
            report.total_net
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pay_employee(
        repo: &dyn PayrollRepository,
        run_id: Uuid,
        employee: &Employee,
        period: PayPeriod,
        input: &MonthlyInput,
        ytd: &YtdAccumulators,
        rules: &Ruleset,
        now: DateTime<Utc>,
    ) -> AppResult<PayrollItem> {
        if !employee.is_active {
            return Err(AppError::Validation(format!(
                "Employee {} is deactivated",
                employee.id
            )));
        }

        let mut advances = repo.list_active_advances(employee.id).await?;
        let deducted = apply_advances(&mut advances);
        let earnings = Self::resolve_earnings(employee, period, input, deducted, rules)?;
        let item = Self::compute_payroll_item(employee, period, &earnings, ytd, rules)?;

        if let Some(swap) = detect_epf_swap(&item) {
            warn!(
                "EPF shares look swapped for employee {}: ee {} > er {}",
                employee.id, swap.employee_share, swap.employer_share
            );
        }

        let record = PayrollItemRecord {
            id: Uuid::new_v4(),
            payroll_run_id: run_id,
            item: item.clone(),
            created_at: now,
            updated_at: now,
        };
        repo.insert_payroll_item_with_advances(&record, &advances).await?;
        Ok(item)
    }

    pub async fn finalise_run(
        repo: &dyn PayrollRepository,
        run_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<PayrollRun> {
        let mut run = repo
            .get_payroll_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payroll run {run_id}")))?;
        if run.status == PayrollStatus::Finalised {
            return Err(AppError::PayrollFinalised(run_id.to_string()));
        }
        run.status = PayrollStatus::Finalised;
        run.finalised_at = Some(now);
        repo.update_payroll_run(&run).await?;
        info!("Payroll run {} finalised", run_id);
        Ok(run)
    }

    /// Recomputes `period` and every later month of the same year for one
    /// employee, carrying YTD forward. Refuses to touch finalised runs.
    pub async fn recompute_from(
        repo: &dyn PayrollRepository,
        employee: &Employee,
        period: PayPeriod,
        rules: &Ruleset,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<PayrollItem>> {
        let mut records = repo.find_payroll_items(employee.id, period.year, 12).await?;
        records.sort_by_key(|r| r.item.month);

        let (earlier, affected): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.item.month < period.month as i32);

        for record in &affected {
            let run = repo
                .get_payroll_run(record.payroll_run_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Payroll run {}", record.payroll_run_id)))?;
            if run.status == PayrollStatus::Finalised {
                return Err(AppError::PayrollFinalised(run.id.to_string()));
            }
        }

        let mut ytd = ytd_from_items(earlier.iter().map(|r| &r.item), period);
        let mut recomputed = Vec::with_capacity(affected.len());
        for mut record in affected {
            let item_period = PayPeriod::of_item(&record.item)?;
            let item = Self::compute_payroll_item(
                employee,
                item_period,
                &record.item.earnings,
                &ytd,
                rules,
            )?;
            ytd = ytd.after(&item);
            record.item = item.clone();
            record.updated_at = now;
            repo.update_payroll_item(&record).await?;
            recomputed.push(item);
        }

        info!(
            "Recomputed {} payroll items for employee {} from {}-{:02}",
            recomputed.len(),
            employee.id,
            period.year,
            period.month
        );
        Ok(recomputed)
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Deducts one instalment from each active advance, never more than what is
/// left. Returns the total taken this month.
pub fn apply_advances(advances: &mut [Advance]) -> Decimal {
    let mut total = dec!(0);
    for advance in advances
        .iter_mut()
        .filter(|a| a.status == AdvanceStatus::Active)
    {
        let take = advance.installment.min(advance.remaining_balance).max(dec!(0));
        advance.remaining_balance -= take;
        if advance.remaining_balance <= dec!(0) {
            advance.remaining_balance = dec!(0);
            advance.status = AdvanceStatus::Completed;
        }
        total += take;
    }
    total
}

/// YTD accumulators from the items of `period.year` strictly before `period`.
pub fn ytd_from_items<'a>(
    items: impl IntoIterator<Item = &'a PayrollItem>,
    period: PayPeriod,
) -> YtdAccumulators {
    items
        .into_iter()
        .filter(|i| i.year == period.year && i.month < period.month as i32)
        .fold(YtdAccumulators::default(), |ytd, item| ytd.after(item))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpfSwap {
    pub employee_share: Decimal,
    pub employer_share: Decimal,
}

/// The employer share is never below the employee share under any rate
/// schedule, so an item showing otherwise was persisted with the two swapped.
pub fn detect_epf_swap(item: &PayrollItem) -> Option<EpfSwap> {
    (item.epf_ee > item.epf_er).then_some(EpfSwap {
        employee_share: item.epf_ee,
        employer_share: item.epf_er,
    })
}

/// Figures printed on a payslip produced by an earlier system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipFigures {
    pub gross: Decimal,
    pub epf_ee: Decimal,
    pub epf_er: Decimal,
    pub socso_ee: Decimal,
    pub socso_er: Decimal,
    pub eis_ee: Decimal,
    pub eis_er: Decimal,
    pub pcb: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlipDiscrepancy {
    pub field: &'static str,
    pub computed: Decimal,
    pub on_slip: Decimal,
}

/// Lists every figure where `slip` disagrees with `computed`.
pub fn reconcile_with_slip(computed: &PayrollItem, slip: &SlipFigures) -> Vec<SlipDiscrepancy> {
    let pairs = [
        ("gross", computed.gross, slip.gross),
        ("epf_ee", computed.epf_ee, slip.epf_ee),
        ("epf_er", computed.epf_er, slip.epf_er),
        ("socso_ee", computed.socso_ee, slip.socso_ee),
        ("socso_er", computed.socso_er, slip.socso_er),
        ("eis_ee", computed.eis_ee, slip.eis_ee),
        ("eis_er", computed.eis_er, slip.eis_er),
        ("pcb", computed.pcb, slip.pcb),
        ("net", computed.net, slip.net),
    ];
    let discrepancies: Vec<SlipDiscrepancy> = pairs
        .into_iter()
        .filter(|(_, ours, theirs)| ours != theirs)
        .map(|(field, ours, theirs)| SlipDiscrepancy {
            field,
            computed: ours,
            on_slip: theirs,
        })
        .collect();
    for d in &discrepancies {
        warn!(
            "Slip mismatch for employee {} {}-{:02}: {} computed {} vs slip {}",
            computed.employee_id, computed.year, computed.month, d.field, d.computed, d.on_slip
        );
    }
    discrepancies
}
