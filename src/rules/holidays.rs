//! National public holidays and the working-day calendar derived from them.

use chrono::{Datelike, NaiveDate, Weekday};

// (month, day) pairs, national holidays only. Replacement days are listed
// where a holiday falls on a Sunday.
#[rustfmt::skip]
const HOLIDAYS_2024: &[(u32, u32)] = &[
    (1, 1), (2, 10), (2, 11), (2, 12), (4, 10), (4, 11), (5, 1), (5, 22),
    (6, 3), (6, 17), (7, 7), (8, 31), (9, 16), (10, 31), (12, 25),
];

#[rustfmt::skip]
const HOLIDAYS_2025: &[(u32, u32)] = &[
    (1, 1), (1, 29), (1, 30), (3, 31), (4, 1), (5, 1), (5, 12), (6, 2),
    (6, 7), (6, 27), (8, 31), (9, 1), (9, 5), (9, 16), (10, 20), (12, 25),
];

#[rustfmt::skip]
const HOLIDAYS_2026: &[(u32, u32)] = &[
    (1, 1), (2, 17), (2, 18), (3, 20), (3, 21), (5, 1), (5, 27), (5, 31),
    (6, 1), (6, 16), (8, 25), (8, 31), (9, 16), (11, 8), (11, 9), (12, 25),
];

fn holidays_for(year: i32) -> &'static [(u32, u32)] {
    match year {
        2024 => HOLIDAYS_2024,
        2025 => HOLIDAYS_2025,
        2026 => HOLIDAYS_2026,
        _ => &[],
    }
}

pub fn is_public_holiday(date: NaiveDate) -> bool {
    holidays_for(date.year()).contains(&(date.month(), date.day()))
}

/// Holidays falling in the given month, in calendar order.
pub fn public_holidays_in(year: i32, month: u32) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = holidays_for(year)
        .iter()
        .filter(|(m, _)| *m == month)
        .filter_map(|(m, d)| NaiveDate::from_ymd_opt(year, *m, *d))
        .collect();
    dates.sort();
    dates
}

/// Monday to Friday, excluding public holidays. Returns 0 for an invalid month.
pub fn working_days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|d| !is_public_holiday(*d))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recognises_fixed_holidays() {
        assert!(is_public_holiday(date(2025, 8, 31)));
        assert!(is_public_holiday(date(2026, 12, 25)));
        assert!(!is_public_holiday(date(2025, 8, 30)));
        assert!(!is_public_holiday(date(2031, 8, 30)));
    }

    #[test]
    fn lists_holidays_for_a_month() {
        assert_eq!(
            public_holidays_in(2025, 1),
            vec![date(2025, 1, 1), date(2025, 1, 29), date(2025, 1, 30)]
        );
        assert!(public_holidays_in(2025, 7).is_empty());
    }

    #[test]
    fn working_days_skip_weekends_and_holidays() {
        // July 2025 has 23 weekdays and no national holiday.
        assert_eq!(working_days_in_month(2025, 7), 23);
        // January 2025: 23 weekdays minus 1, 29 and 30 January.
        assert_eq!(working_days_in_month(2025, 1), 20);
        assert_eq!(working_days_in_month(2025, 13), 0);
    }
}
