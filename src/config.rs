// src/config.rs

use crate::errors::{AppError, AppResult};
use chrono::FixedOffset;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{env, fmt::Display, str::FromStr};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub geocoder_url: Option<String>,
    pub ruleset: Ruleset,
    pub attendance: AttendanceConfig,
    pub retention: RetentionConfig,
}

/// Statutory constants fed to the payroll calculators.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub epf_ceiling: Decimal,
    /// Wages at or below this attract the higher employer EPF rate.
    pub epf_rate_threshold: Decimal,
    /// Wage ceiling used when estimating the SOCSO/EIS tax relief.
    pub socso_eis_ceiling: Decimal,
    pub individual_relief: Decimal,
    pub spouse_relief: Decimal,
    pub child_relief_each: Decimal,
    pub disabled_self_relief: Decimal,
    pub disabled_spouse_relief: Decimal,
    pub socso_relief_cap: Decimal,
    pub eis_relief_cap: Decimal,
    pub epf_relief_cap: Decimal,
    pub pcb_min_payable: Decimal,
    pub pcb_round_step: Decimal,
    pub ot_multiplier: Decimal,
    pub ph_multiplier: Decimal,
    pub standard_hours_per_day: Decimal,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            epf_ceiling: dec!(20000),
            epf_rate_threshold: dec!(5000),
            socso_eis_ceiling: dec!(5000),
            individual_relief: dec!(9000),
            spouse_relief: dec!(4000),
            child_relief_each: dec!(2000),
            disabled_self_relief: dec!(6000),
            disabled_spouse_relief: dec!(5000),
            socso_relief_cap: dec!(350),
            eis_relief_cap: dec!(350),
            epf_relief_cap: dec!(4000),
            pcb_min_payable: dec!(10.00),
            pcb_round_step: dec!(0.05),
            ot_multiplier: dec!(1.0),
            ph_multiplier: dec!(1.0),
            standard_hours_per_day: dec!(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceCheckConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub min_confidence: f32,
    /// Face box width or height as a fraction of the image side.
    pub min_face_ratio: f32,
    pub min_brightness: f64,
    pub max_brightness: f64,
    /// Laplacian variance floor.
    pub min_sharpness: f64,
}

impl Default for FaceCheckConfig {
    fn default() -> Self {
        Self {
            min_width: 200,
            min_height: 200,
            min_confidence: 0.7,
            min_face_ratio: 0.15,
            min_brightness: 40.0,
            max_brightness: 220.0,
            min_sharpness: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceConfig {
    pub daily_standard_minutes: i64,
    pub max_session_minutes: i64,
    pub local_offset: FixedOffset,
    pub face: FaceCheckConfig,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            daily_standard_minutes: 480,
            max_session_minutes: 16 * 60,
            local_offset: MALAYSIA_OFFSET,
            face: FaceCheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionConfig {
    pub soft_delete_months: u32,
    pub hard_delete_months: u32,
    pub batch_size: u32,
    pub max_records_per_run: u32,
    pub dry_run: bool,
    pub force: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            soft_delete_months: 6,
            hard_delete_months: 12,
            batch_size: 100,
            max_records_per_run: 10_000,
            dry_run: false,
            force: false,
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::Config("BATCH_SIZE must be greater than 0".to_string()));
        }
        if self.hard_delete_months < self.soft_delete_months {
            return Err(AppError::Config(
                "HARD_DELETE_MONTHS must not be shorter than SOFT_DELETE_MONTHS".to_string(),
            ));
        }
        Ok(())
    }
}

const MALAYSIA_OFFSET: FixedOffset = match FixedOffset::east_opt(8 * 3600) {
    Some(offset) => offset,
    None => panic!("UTC+08:00 is a valid offset"),
};

fn var_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is malformed ({raw:?}): {e}"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?;

        let defaults = Ruleset::default();
        let ruleset = Ruleset {
            epf_ceiling: var_or("EPF_CEILING", defaults.epf_ceiling)?,
            epf_rate_threshold: var_or("EPF_RATE_THRESHOLD", defaults.epf_rate_threshold)?,
            socso_eis_ceiling: var_or("SOCSO_EIS_CEILING", defaults.socso_eis_ceiling)?,
            individual_relief: var_or("INDIVIDUAL_RELIEF", defaults.individual_relief)?,
            spouse_relief: var_or("SPOUSE_RELIEF", defaults.spouse_relief)?,
            child_relief_each: var_or("CHILD_RELIEF_EACH", defaults.child_relief_each)?,
            disabled_self_relief: var_or("DISABLED_SELF_RELIEF", defaults.disabled_self_relief)?,
            disabled_spouse_relief: var_or(
                "DISABLED_SPOUSE_RELIEF",
                defaults.disabled_spouse_relief,
            )?,
            socso_relief_cap: var_or("SOCSO_RELIEF_CAP", defaults.socso_relief_cap)?,
            eis_relief_cap: var_or("EIS_RELIEF_CAP", defaults.eis_relief_cap)?,
            epf_relief_cap: var_or("EPF_RELIEF_CAP", defaults.epf_relief_cap)?,
            pcb_min_payable: var_or("PCB_MIN_PAYABLE", defaults.pcb_min_payable)?,
            pcb_round_step: var_or("PCB_ROUND_STEP", defaults.pcb_round_step)?,
            ot_multiplier: var_or("OT_MULTIPLIER", defaults.ot_multiplier)?,
            ph_multiplier: var_or("PH_MULTIPLIER", defaults.ph_multiplier)?,
            standard_hours_per_day: var_or(
                "STANDARD_HOURS_PER_DAY",
                defaults.standard_hours_per_day,
            )?,
        };
        if ruleset.pcb_round_step <= Decimal::ZERO {
            return Err(AppError::Config("PCB_ROUND_STEP must be positive".to_string()));
        }
        if ruleset.standard_hours_per_day <= Decimal::ZERO {
            return Err(AppError::Config(
                "STANDARD_HOURS_PER_DAY must be positive".to_string(),
            ));
        }

        let attendance_defaults = AttendanceConfig::default();
        let offset_hours: i32 = var_or("LOCAL_UTC_OFFSET_HOURS", 8)?;
        let local_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!("LOCAL_UTC_OFFSET_HOURS out of range: {offset_hours}"))
        })?;
        let attendance = AttendanceConfig {
            daily_standard_minutes: var_or(
                "DAILY_STANDARD_MINUTES",
                attendance_defaults.daily_standard_minutes,
            )?,
            max_session_minutes: var_or(
                "MAX_SESSION_MINUTES",
                attendance_defaults.max_session_minutes,
            )?,
            local_offset,
            face: attendance_defaults.face,
        };

        let retention_defaults = RetentionConfig::default();
        let retention = RetentionConfig {
            soft_delete_months: var_or("SOFT_DELETE_MONTHS", retention_defaults.soft_delete_months)?,
            hard_delete_months: var_or("HARD_DELETE_MONTHS", retention_defaults.hard_delete_months)?,
            batch_size: var_or("BATCH_SIZE", retention_defaults.batch_size)?,
            max_records_per_run: var_or(
                "MAX_RECORDS_PER_RUN",
                retention_defaults.max_records_per_run,
            )?,
            dry_run: false,
            force: false,
        };
        retention.validate()?;

        Ok(Self {
            database_url,
            max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            geocoder_url: env::var("GEOCODER_URL").ok().filter(|u| !u.trim().is_empty()),
            ruleset,
            attendance,
            retention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_options() {
        let rules = Ruleset::default();
        assert_eq!(rules.epf_ceiling, dec!(20000));
        assert_eq!(rules.socso_eis_ceiling, dec!(5000));
        assert_eq!(rules.pcb_min_payable, dec!(10.00));
        assert_eq!(rules.pcb_round_step, dec!(0.05));
        assert_eq!(rules.ot_multiplier, dec!(1.0));

        let retention = RetentionConfig::default();
        assert_eq!(retention.soft_delete_months, 6);
        assert_eq!(retention.hard_delete_months, 12);
        assert_eq!(retention.batch_size, 100);
        assert_eq!(retention.max_records_per_run, 10_000);

        let attendance = AttendanceConfig::default();
        assert_eq!(attendance.daily_standard_minutes, 480);
        assert_eq!(attendance.local_offset.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn retention_windows_must_be_ordered() {
        let cfg = RetentionConfig {
            soft_delete_months: 12,
            hard_delete_months: 6,
            ..RetentionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));

        let zero_batch = RetentionConfig {
            batch_size: 0,
            ..RetentionConfig::default()
        };
        assert!(zero_batch.validate().is_err());
    }
}
