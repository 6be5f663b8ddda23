// src/models/mod.rs

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

// ─── Identity ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResidentStatus {
    Resident,
    NonResident,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

// ─── Employee ─────────────────────────────────────────────────────────────────

// Custom Postgres enums need #[sqlx(type_name = "...")] matching the migration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "employment_class", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmploymentClass {
    Probation,
    Confirmed,
    Contract,
    PartTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "employee_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Staff,
    Supervisor,
    Manager,
    Director,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "marital_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Option<Uuid>,
    pub full_name: String,
    /// National ID (YYMMDD-SS-NNNN) or passport number.
    pub id_number: String,
    /// Only consulted for passport holders.
    pub date_of_birth: Option<NaiveDate>,
    pub employment_class: EmploymentClass,
    pub role: EmployeeRole,
    pub basic_salary: Decimal,
    pub hourly_rate: Option<Decimal>,
    pub bank_name: String,
    pub bank_account_number: String,
    pub bank_account_holder: String,
    pub epf_number: Option<String>,
    pub socso_number: Option<String>,
    pub tax_number: Option<String>,
    pub marital_status: MaritalStatus,
    pub spouse_working: bool,
    pub children_count: i32,
    pub disabled: bool,
    pub spouse_disabled: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn is_part_time(&self) -> bool {
        self.employment_class == EmploymentClass::PartTime
    }

    /// part_time ⇒ basic = 0 and hourly > 0; everyone else needs a positive basic.
    pub fn validate(&self) -> AppResult<()> {
        if self.is_part_time() {
            if !self.basic_salary.is_zero() {
                return Err(AppError::Validation(format!(
                    "Part-time employee {} must not carry a basic salary",
                    self.id
                )));
            }
            match self.hourly_rate {
                Some(rate) if rate > dec!(0) => {}
                _ => {
                    return Err(AppError::Validation(format!(
                        "Part-time employee {} needs a positive hourly rate",
                        self.id
                    )));
                }
            }
        } else if self.basic_salary <= dec!(0) {
            return Err(AppError::Validation(format!(
                "Employee {} needs a positive basic salary",
                self.id
            )));
        }
        if self.children_count < 0 {
            return Err(AppError::Validation(
                "Children count cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Payroll Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payroll_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Finalised,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayrollRun {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub status: PayrollStatus,
    pub created_at: DateTime<Utc>,
    pub finalised_at: Option<DateTime<Utc>>,
}

// ─── Payroll Item ─────────────────────────────────────────────────────────────

/// Monthly earnings decomposition, all amounts in ringgit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Earnings {
    pub basic: Decimal,
    pub commission: Decimal,
    pub fixed_allowance: Decimal,
    pub overtime_amount: Decimal,
    pub bonus: Decimal,
    pub incentive: Decimal,
    pub claims: Decimal,
    pub advance_deducted: Decimal,
    pub unpaid_leave_deduction: Decimal,
    pub other_deductions: Decimal,
    pub zakat: Decimal,
}

impl Earnings {
    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            ("basic", self.basic),
            ("commission", self.commission),
            ("fixed_allowance", self.fixed_allowance),
            ("overtime_amount", self.overtime_amount),
            ("bonus", self.bonus),
            ("incentive", self.incentive),
            ("claims", self.claims),
            ("advance_deducted", self.advance_deducted),
            ("unpaid_leave_deduction", self.unpaid_leave_deduction),
            ("other_deductions", self.other_deductions),
            ("zakat", self.zakat),
        ];
        for (name, value) in fields {
            if value < dec!(0) {
                return Err(AppError::Validation(format!("{name} cannot be negative")));
            }
        }
        Ok(())
    }
}

/// Year-to-date figures from months already paid this year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YtdAccumulators {
    /// Taxable remuneration (normal + additional) paid in prior months.
    pub gross: Decimal,
    pub epf: Decimal,
    pub pcb: Decimal,
    pub zakat: Decimal,
    /// SOCSO and EIS employee shares already claimed as relief.
    pub socso_relief: Decimal,
    pub eis_relief: Decimal,
}

impl YtdAccumulators {
    /// Accumulators after `item` has been paid.
    pub fn after(&self, item: &PayrollItem) -> Self {
        Self {
            gross: self.gross + item.statutory_base,
            epf: self.epf + item.epf_ee,
            pcb: self.pcb + item.pcb,
            zakat: self.zakat + item.earnings.zakat,
            socso_relief: self.socso_relief + item.socso_ee,
            eis_relief: self.eis_relief + item.eis_ee,
        }
    }
}

/// Computed payroll line for one employee-month. Pure data; identity and
/// timestamps live on [`PayrollItemRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PayrollItem {
    pub employee_id: Uuid,
    pub year: i32,
    pub month: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub earnings: Earnings,
    pub gross: Decimal,
    pub statutory_base: Decimal,
    pub epf_ee: Decimal,
    pub epf_er: Decimal,
    pub socso_ee: Decimal,
    pub socso_er: Decimal,
    pub eis_ee: Decimal,
    pub eis_er: Decimal,
    pub pcb: Decimal,
    pub total_employee_deductions: Decimal,
    pub total_employer_contributions: Decimal,
    pub net: Decimal,
    pub ytd_snapshot: Json<YtdAccumulators>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PayrollItemRecord {
    pub id: Uuid,
    pub payroll_run_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: PayrollItem,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Salary Advance ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "advance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Advance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub installment: Decimal,
    pub remaining_balance: Decimal,
    pub status: AdvanceStatus,
    pub created_at: DateTime<Utc>,
}

// ─── Attendance ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "clock_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    NotStarted,
    Working,
    OnBreak,
    Completed,
    AutoClosed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClockEvent {
    ClockIn1,
    ClockOut1,
    ClockIn2,
    ClockOut2,
}

impl ClockEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockEvent::ClockIn1 => "clock_in_1",
            ClockEvent::ClockOut1 => "clock_out_1",
            ClockEvent::ClockIn2 => "clock_in_2",
            ClockEvent::ClockOut2 => "clock_out_2",
        }
    }

    /// Suffix shared by the photo/location/address/face columns of this event.
    fn slot(&self) -> &'static str {
        match self {
            ClockEvent::ClockIn1 => "in_1",
            ClockEvent::ClockOut1 => "out_1",
            ClockEvent::ClockIn2 => "in_2",
            ClockEvent::ClockOut2 => "out_2",
        }
    }

    pub fn photo_field(&self) -> String {
        format!("photo_{}", self.slot())
    }

    pub fn address_field(&self) -> String {
        format!("address_{}", self.slot())
    }
}

impl std::fmt::Display for ClockEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    Camera,
    File,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    pub fn validate(&self) -> AppResult<()> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lng_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if !lat_ok || !lng_ok {
            return Err(AppError::Validation(format!(
                "GPS fix out of range: {}, {}",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }

    /// Stored form, "lat,lng" with 6 decimal places.
    pub fn to_location(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Every column the retention sweeper clears.
pub const MEDIA_FIELDS: [&str; 8] = [
    "photo_in_1",
    "photo_out_1",
    "photo_in_2",
    "photo_out_2",
    "address_in_1",
    "address_out_1",
    "address_in_2",
    "address_out_2",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClockRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub clock_in_1: Option<NaiveTime>,
    pub clock_out_1: Option<NaiveTime>,
    pub clock_in_2: Option<NaiveTime>,
    pub clock_out_2: Option<NaiveTime>,
    pub location_in_1: Option<String>,
    pub location_out_1: Option<String>,
    pub location_in_2: Option<String>,
    pub location_out_2: Option<String>,
    pub photo_in_1: Option<String>,
    pub photo_out_1: Option<String>,
    pub photo_in_2: Option<String>,
    pub photo_out_2: Option<String>,
    pub face_detected_in_1: Option<bool>,
    pub face_detected_out_1: Option<bool>,
    pub face_detected_in_2: Option<bool>,
    pub face_detected_out_2: Option<bool>,
    pub address_in_1: Option<String>,
    pub address_out_1: Option<String>,
    pub address_in_2: Option<String>,
    pub address_out_2: Option<String>,
    pub total_work_minutes: i32,
    pub overtime_minutes: i32,
    pub is_invalid: bool,
    pub status: ClockStatus,
    pub version: i32,
    pub media_retention_eligible_at: Option<DateTime<Utc>>,
    pub media_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything captured alongside one clock event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCapture {
    pub time: NaiveTime,
    pub location: String,
    pub photo: String,
    pub face_detected: bool,
    pub address: Option<String>,
}

impl ClockRecord {
    pub fn new(employee_id: Uuid, work_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id,
            work_date,
            clock_in_1: None,
            clock_out_1: None,
            clock_in_2: None,
            clock_out_2: None,
            location_in_1: None,
            location_out_1: None,
            location_in_2: None,
            location_out_2: None,
            photo_in_1: None,
            photo_out_1: None,
            photo_in_2: None,
            photo_out_2: None,
            face_detected_in_1: None,
            face_detected_out_1: None,
            face_detected_in_2: None,
            face_detected_out_2: None,
            address_in_1: None,
            address_out_1: None,
            address_in_2: None,
            address_out_2: None,
            total_work_minutes: 0,
            overtime_minutes: 0,
            is_invalid: false,
            status: ClockStatus::NotStarted,
            version: 0,
            media_retention_eligible_at: None,
            media_deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn time_of(&self, event: ClockEvent) -> Option<NaiveTime> {
        match event {
            ClockEvent::ClockIn1 => self.clock_in_1,
            ClockEvent::ClockOut1 => self.clock_out_1,
            ClockEvent::ClockIn2 => self.clock_in_2,
            ClockEvent::ClockOut2 => self.clock_out_2,
        }
    }

    pub fn record_capture(&mut self, event: ClockEvent, capture: EventCapture) {
        let EventCapture {
            time,
            location,
            photo,
            face_detected,
            address,
        } = capture;
        let (t, l, p, f, a) = match event {
            ClockEvent::ClockIn1 => (
                &mut self.clock_in_1,
                &mut self.location_in_1,
                &mut self.photo_in_1,
                &mut self.face_detected_in_1,
                &mut self.address_in_1,
            ),
            ClockEvent::ClockOut1 => (
                &mut self.clock_out_1,
                &mut self.location_out_1,
                &mut self.photo_out_1,
                &mut self.face_detected_out_1,
                &mut self.address_out_1,
            ),
            ClockEvent::ClockIn2 => (
                &mut self.clock_in_2,
                &mut self.location_in_2,
                &mut self.photo_in_2,
                &mut self.face_detected_in_2,
                &mut self.address_in_2,
            ),
            ClockEvent::ClockOut2 => (
                &mut self.clock_out_2,
                &mut self.location_out_2,
                &mut self.photo_out_2,
                &mut self.face_detected_out_2,
                &mut self.address_out_2,
            ),
        };
        *t = Some(time);
        *l = Some(location);
        *p = Some(photo);
        *f = Some(face_detected);
        *a = address;
    }

    fn media_slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "photo_in_1" => Some(&mut self.photo_in_1),
            "photo_out_1" => Some(&mut self.photo_out_1),
            "photo_in_2" => Some(&mut self.photo_in_2),
            "photo_out_2" => Some(&mut self.photo_out_2),
            "address_in_1" => Some(&mut self.address_in_1),
            "address_out_1" => Some(&mut self.address_out_1),
            "address_in_2" => Some(&mut self.address_in_2),
            "address_out_2" => Some(&mut self.address_out_2),
            _ => None,
        }
    }

    pub fn media_values(&self) -> [&Option<String>; 8] {
        [
            &self.photo_in_1,
            &self.photo_out_1,
            &self.photo_in_2,
            &self.photo_out_2,
            &self.address_in_1,
            &self.address_out_1,
            &self.address_in_2,
            &self.address_out_2,
        ]
    }

    pub fn has_media(&self) -> bool {
        self.media_values().iter().any(|v| v.is_some())
    }

    /// Names of the media columns currently holding a value.
    pub fn populated_media_fields(&self) -> Vec<String> {
        MEDIA_FIELDS
            .iter()
            .zip(self.media_values())
            .filter(|(_, v)| v.is_some())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Nulls the listed media columns and stamps `media_deleted_at`.
    pub fn clear_media(&mut self, fields: &[String], at: DateTime<Utc>) -> AppResult<()> {
        for field in fields {
            let slot = self
                .media_slot(field)
                .ok_or_else(|| AppError::Validation(format!("Not a media field: {field}")))?;
            *slot = None;
        }
        self.media_deleted_at = Some(at);
        self.updated_at = at;
        Ok(())
    }
}

// ─── Retention Log ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RetentionLog {
    pub id: Uuid,
    pub clock_record_id: Uuid,
    pub cleared_fields: Vec<String>,
    pub cleared_at: DateTime<Utc>,
}
