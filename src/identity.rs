//! National ID (MyKad) parsing.
//!
//! A 12-digit number of the form `YYMMDD-SS-NNNN` (dashes optional) encodes
//! the birth date, the place-of-birth code `SS` and a serial whose last digit
//! is odd for men and even for women. Anything else is treated as a passport.

use crate::models::{Gender, ResidentStatus};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Age assumed for passport holders with no recorded date of birth.
pub const DEFAULT_PASSPORT_AGE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalId {
    pub birth_date: NaiveDate,
    pub state_code: u8,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityKind {
    NationalId(NationalId),
    Passport,
}

/// What the payroll calculators need to know about a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub kind: IdentityKind,
    pub age: u32,
    pub gender: Option<Gender>,
    pub resident_status: ResidentStatus,
}

fn is_known_state_code(code: u8) -> bool {
    matches!(code, 1..=16 | 21..=68 | 71 | 72 | 74..=79 | 82..=93 | 98 | 99)
}

/// Parses a national ID. `today` fixes the century pivot: two-digit years up
/// to the current year's last two digits are 20xx, the rest 19xx.
pub fn parse_national_id(raw: &str, today: NaiveDate) -> Option<NationalId> {
    let compact: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if compact.len() != 12 || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Only digits past this point, so every slice is valid ASCII.
    let digits = |range: std::ops::Range<usize>| compact[range].parse::<u32>().ok();

    let yy = digits(0..2)?;
    let month = digits(2..4)?;
    let day = digits(4..6)?;
    let state_code = u8::try_from(digits(6..8)?).ok()?;
    let last = digits(11..12)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !is_known_state_code(state_code)
    {
        return None;
    }

    let pivot = (today.year() % 100) as u32;
    let year = if yy <= pivot { 2000 + yy } else { 1900 + yy };
    let birth_date = NaiveDate::from_ymd_opt(year as i32, month, day)?;

    Some(NationalId {
        birth_date,
        state_code,
        gender: if last % 2 == 1 {
            Gender::Male
        } else {
            Gender::Female
        },
    })
}

/// Full years between `birth_date` and `today`; zero for future dates.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Classifies `id_number` and derives age, gender and residency.
pub fn profile(id_number: &str, date_of_birth: Option<NaiveDate>, today: NaiveDate) -> IdentityProfile {
    match parse_national_id(id_number, today) {
        Some(id) => IdentityProfile {
            kind: IdentityKind::NationalId(id),
            age: age_on(id.birth_date, today),
            gender: Some(id.gender),
            resident_status: ResidentStatus::Resident,
        },
        None => IdentityProfile {
            kind: IdentityKind::Passport,
            age: date_of_birth
                .map(|dob| age_on(dob, today))
                .unwrap_or(DEFAULT_PASSPORT_AGE),
            gender: None,
            resident_status: ResidentStatus::NonResident,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_with_and_without_dashes() {
        let today = date(2025, 6, 1);
        let a = parse_national_id("900115-14-5673", today).unwrap();
        let b = parse_national_id("900115145673", today).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.birth_date, date(1990, 1, 15));
        assert_eq!(a.state_code, 14);
        assert_eq!(a.gender, Gender::Male);
    }

    #[test]
    fn century_pivot_uses_current_year() {
        let today = date(2025, 6, 1);
        assert_eq!(
            parse_national_id("250101-10-1234", today).unwrap().birth_date.year(),
            2025
        );
        assert_eq!(
            parse_national_id("260101-10-1234", today).unwrap().birth_date.year(),
            1926
        );
    }

    #[test]
    fn even_last_digit_is_female() {
        let id = parse_national_id("880520-08-1234", date(2025, 1, 1)).unwrap();
        assert_eq!(id.gender, Gender::Female);
    }

    #[test]
    fn rejects_bad_month_day_and_state() {
        let today = date(2025, 1, 1);
        assert!(parse_national_id("901315-14-5673", today).is_none());
        assert!(parse_national_id("900132-14-5673", today).is_none());
        assert!(parse_national_id("900115-17-5673", today).is_none());
        assert!(parse_national_id("900230-14-5673", today).is_none());
        assert!(parse_national_id("A1234567", today).is_none());
    }

    #[test]
    fn age_counts_full_years() {
        assert_eq!(age_on(date(1965, 6, 2), date(2025, 6, 1)), 59);
        assert_eq!(age_on(date(1965, 6, 1), date(2025, 6, 1)), 60);
        assert_eq!(age_on(date(2030, 1, 1), date(2025, 6, 1)), 0);
    }

    #[test]
    fn passports_fall_back_to_date_of_birth_then_default() {
        let today = date(2025, 6, 1);
        let with_dob = profile("K12345678", Some(date(1980, 1, 1)), today);
        assert_eq!(with_dob.kind, IdentityKind::Passport);
        assert_eq!(with_dob.age, 45);
        assert_eq!(with_dob.resident_status, ResidentStatus::NonResident);

        let without = profile("K12345678", None, today);
        assert_eq!(without.age, DEFAULT_PASSPORT_AGE);
        assert_eq!(without.gender, None);
    }

    #[test]
    fn national_id_holders_are_residents() {
        let p = profile("650601-01-1235", None, date(2025, 6, 1));
        assert_eq!(p.age, 60);
        assert_eq!(p.resident_status, ResidentStatus::Resident);
        assert_eq!(p.gender, Some(Gender::Male));
    }
}
