//! SOCSO (First Schedule) contribution steps.

use crate::models::ResidentStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// From this age only the employment-injury category applies (employer side only).
pub const SOCSO_SENIOR_AGE: u32 = 60;

/// One bracket of the schedule. The bracket covers wages above the previous
/// row's `max` up to and including this row's `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocsoRow {
    pub max: Decimal,
    /// First category (employment injury + invalidity), employee share.
    pub ee: Decimal,
    /// First category, employer share.
    pub er: Decimal,
    /// Second category (employment injury only), employer share.
    pub er_injury_only: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContribution {
    pub ee: Decimal,
    pub er: Decimal,
}

impl StepContribution {
    pub const ZERO: StepContribution = StepContribution {
        ee: dec!(0.00),
        er: dec!(0.00),
    };
}

#[rustfmt::skip]
pub const SOCSO_TABLE: &[SocsoRow] = &[
    SocsoRow { max: dec!(30), ee: dec!(0.10), er: dec!(0.40), er_injury_only: dec!(0.30) },
    SocsoRow { max: dec!(50), ee: dec!(0.20), er: dec!(0.70), er_injury_only: dec!(0.50) },
    SocsoRow { max: dec!(70), ee: dec!(0.30), er: dec!(1.10), er_injury_only: dec!(0.80) },
    SocsoRow { max: dec!(100), ee: dec!(0.40), er: dec!(1.50), er_injury_only: dec!(1.10) },
    SocsoRow { max: dec!(140), ee: dec!(0.60), er: dec!(2.10), er_injury_only: dec!(1.50) },
    SocsoRow { max: dec!(200), ee: dec!(0.85), er: dec!(2.95), er_injury_only: dec!(2.10) },
    SocsoRow { max: dec!(300), ee: dec!(1.25), er: dec!(4.35), er_injury_only: dec!(3.10) },
    SocsoRow { max: dec!(400), ee: dec!(1.75), er: dec!(6.15), er_injury_only: dec!(4.40) },
    SocsoRow { max: dec!(500), ee: dec!(2.25), er: dec!(7.85), er_injury_only: dec!(5.60) },
    SocsoRow { max: dec!(600), ee: dec!(2.75), er: dec!(9.65), er_injury_only: dec!(6.90) },
    SocsoRow { max: dec!(700), ee: dec!(3.25), er: dec!(11.35), er_injury_only: dec!(8.10) },
    SocsoRow { max: dec!(800), ee: dec!(3.75), er: dec!(13.15), er_injury_only: dec!(9.40) },
    SocsoRow { max: dec!(900), ee: dec!(4.25), er: dec!(14.85), er_injury_only: dec!(10.60) },
    SocsoRow { max: dec!(1000), ee: dec!(4.75), er: dec!(16.65), er_injury_only: dec!(11.90) },
    SocsoRow { max: dec!(1100), ee: dec!(5.25), er: dec!(18.35), er_injury_only: dec!(13.10) },
    SocsoRow { max: dec!(1200), ee: dec!(5.75), er: dec!(20.15), er_injury_only: dec!(14.40) },
    SocsoRow { max: dec!(1300), ee: dec!(6.25), er: dec!(21.85), er_injury_only: dec!(15.60) },
    SocsoRow { max: dec!(1400), ee: dec!(6.75), er: dec!(23.65), er_injury_only: dec!(16.90) },
    SocsoRow { max: dec!(1500), ee: dec!(7.25), er: dec!(25.35), er_injury_only: dec!(18.10) },
    SocsoRow { max: dec!(1600), ee: dec!(7.75), er: dec!(27.15), er_injury_only: dec!(19.40) },
    SocsoRow { max: dec!(1700), ee: dec!(8.25), er: dec!(28.85), er_injury_only: dec!(20.60) },
    SocsoRow { max: dec!(1800), ee: dec!(8.75), er: dec!(30.65), er_injury_only: dec!(21.90) },
    SocsoRow { max: dec!(1900), ee: dec!(9.25), er: dec!(32.35), er_injury_only: dec!(23.10) },
    SocsoRow { max: dec!(2000), ee: dec!(9.75), er: dec!(34.15), er_injury_only: dec!(24.40) },
    SocsoRow { max: dec!(2100), ee: dec!(10.25), er: dec!(35.85), er_injury_only: dec!(25.60) },
    SocsoRow { max: dec!(2200), ee: dec!(10.75), er: dec!(37.65), er_injury_only: dec!(26.90) },
    SocsoRow { max: dec!(2300), ee: dec!(11.25), er: dec!(39.35), er_injury_only: dec!(28.10) },
    SocsoRow { max: dec!(2400), ee: dec!(11.75), er: dec!(41.15), er_injury_only: dec!(29.40) },
    SocsoRow { max: dec!(2500), ee: dec!(12.25), er: dec!(42.85), er_injury_only: dec!(30.60) },
    SocsoRow { max: dec!(2600), ee: dec!(12.75), er: dec!(44.65), er_injury_only: dec!(31.90) },
    SocsoRow { max: dec!(2700), ee: dec!(13.25), er: dec!(46.35), er_injury_only: dec!(33.10) },
    SocsoRow { max: dec!(2800), ee: dec!(13.75), er: dec!(48.15), er_injury_only: dec!(34.40) },
    SocsoRow { max: dec!(2900), ee: dec!(14.25), er: dec!(49.85), er_injury_only: dec!(35.60) },
    SocsoRow { max: dec!(3000), ee: dec!(14.75), er: dec!(51.65), er_injury_only: dec!(36.90) },
    SocsoRow { max: dec!(3100), ee: dec!(15.25), er: dec!(53.35), er_injury_only: dec!(38.10) },
    SocsoRow { max: dec!(3200), ee: dec!(15.75), er: dec!(55.15), er_injury_only: dec!(39.40) },
    SocsoRow { max: dec!(3300), ee: dec!(16.25), er: dec!(56.85), er_injury_only: dec!(40.60) },
    SocsoRow { max: dec!(3400), ee: dec!(16.75), er: dec!(58.65), er_injury_only: dec!(41.90) },
    SocsoRow { max: dec!(3500), ee: dec!(17.25), er: dec!(60.35), er_injury_only: dec!(43.10) },
    SocsoRow { max: dec!(3600), ee: dec!(17.75), er: dec!(62.15), er_injury_only: dec!(44.40) },
    SocsoRow { max: dec!(3700), ee: dec!(18.25), er: dec!(63.85), er_injury_only: dec!(45.60) },
    SocsoRow { max: dec!(3800), ee: dec!(18.75), er: dec!(65.65), er_injury_only: dec!(46.90) },
    SocsoRow { max: dec!(3900), ee: dec!(19.25), er: dec!(67.35), er_injury_only: dec!(48.10) },
    SocsoRow { max: dec!(4000), ee: dec!(19.75), er: dec!(69.15), er_injury_only: dec!(49.40) },
    SocsoRow { max: dec!(4100), ee: dec!(20.25), er: dec!(70.85), er_injury_only: dec!(50.60) },
    SocsoRow { max: dec!(4200), ee: dec!(20.75), er: dec!(72.65), er_injury_only: dec!(51.90) },
    SocsoRow { max: dec!(4300), ee: dec!(21.25), er: dec!(74.35), er_injury_only: dec!(53.10) },
    SocsoRow { max: dec!(4400), ee: dec!(21.75), er: dec!(76.15), er_injury_only: dec!(54.40) },
    SocsoRow { max: dec!(4500), ee: dec!(22.25), er: dec!(77.85), er_injury_only: dec!(55.60) },
    SocsoRow { max: dec!(4600), ee: dec!(22.75), er: dec!(79.65), er_injury_only: dec!(56.90) },
    SocsoRow { max: dec!(4700), ee: dec!(23.25), er: dec!(81.35), er_injury_only: dec!(58.10) },
    SocsoRow { max: dec!(4800), ee: dec!(23.75), er: dec!(83.15), er_injury_only: dec!(59.40) },
    SocsoRow { max: dec!(4900), ee: dec!(24.25), er: dec!(84.85), er_injury_only: dec!(60.60) },
    SocsoRow { max: dec!(5000), ee: dec!(24.75), er: dec!(86.65), er_injury_only: dec!(61.90) },
    SocsoRow { max: dec!(5100), ee: dec!(25.25), er: dec!(88.35), er_injury_only: dec!(63.10) },
    SocsoRow { max: dec!(5200), ee: dec!(25.75), er: dec!(90.15), er_injury_only: dec!(64.40) },
    SocsoRow { max: dec!(5300), ee: dec!(26.25), er: dec!(91.85), er_injury_only: dec!(65.60) },
    SocsoRow { max: dec!(5400), ee: dec!(26.75), er: dec!(93.65), er_injury_only: dec!(66.90) },
    SocsoRow { max: dec!(5500), ee: dec!(27.25), er: dec!(95.35), er_injury_only: dec!(68.10) },
    SocsoRow { max: dec!(5600), ee: dec!(27.75), er: dec!(97.15), er_injury_only: dec!(69.40) },
    SocsoRow { max: dec!(5700), ee: dec!(28.25), er: dec!(98.85), er_injury_only: dec!(70.60) },
    SocsoRow { max: dec!(5800), ee: dec!(28.75), er: dec!(100.65), er_injury_only: dec!(71.90) },
    SocsoRow { max: dec!(5900), ee: dec!(29.25), er: dec!(102.35), er_injury_only: dec!(73.10) },
    SocsoRow { max: dec!(6000), ee: dec!(29.75), er: dec!(104.15), er_injury_only: dec!(74.40) },
];

/// Insured wage ceiling: the last row's upper bound.
pub fn socso_ceiling() -> Decimal {
    SOCSO_TABLE[SOCSO_TABLE.len() - 1].max
}

/// Index of the bracket holding `wage`; wages above the ceiling land on the last row.
pub fn socso_index(wage: Decimal) -> usize {
    SOCSO_TABLE
        .iter()
        .position(|row| wage <= row.max)
        .unwrap_or(SOCSO_TABLE.len() - 1)
}

/// Lower bound of bracket `index` (previous max + 0.01).
pub fn socso_bracket_min(index: usize) -> Decimal {
    match index {
        0 => dec!(0.01),
        i => SOCSO_TABLE[i - 1].max + dec!(0.01),
    }
}

pub fn socso_row(wage: Decimal) -> &'static SocsoRow {
    &SOCSO_TABLE[socso_index(wage)]
}

/// Contribution pair for `wage`, honouring the age and residency variants.
pub fn socso_step(wage: Decimal, age: u32, status: ResidentStatus) -> StepContribution {
    if wage <= Decimal::ZERO {
        return StepContribution::ZERO;
    }
    let row = socso_row(wage);
    if age >= SOCSO_SENIOR_AGE || status == ResidentStatus::NonResident {
        return StepContribution {
            ee: dec!(0.00),
            er: row.er_injury_only,
        };
    }
    StepContribution {
        ee: row.ee,
        er: row.er,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_strictly_increasing() {
        for pair in SOCSO_TABLE.windows(2) {
            assert!(pair[0].max < pair[1].max);
            assert!(pair[0].ee <= pair[1].ee);
            assert!(pair[0].er < pair[1].er);
        }
        assert_eq!(socso_ceiling(), dec!(6000));
    }

    #[test]
    fn boundaries_are_half_open() {
        for (i, row) in SOCSO_TABLE.iter().enumerate() {
            assert_eq!(socso_step(row.max, 30, ResidentStatus::Resident).ee, row.ee);
            if i + 1 < SOCSO_TABLE.len() {
                let next = socso_step(row.max + dec!(0.01), 30, ResidentStatus::Resident);
                assert_eq!(next.ee, SOCSO_TABLE[i + 1].ee);
                assert_eq!(socso_bracket_min(i + 1), row.max + dec!(0.01));
            }
        }
    }

    #[test]
    fn known_schedule_values() {
        let at_4300 = socso_step(dec!(4300), 30, ResidentStatus::Resident);
        assert_eq!((at_4300.ee, at_4300.er), (dec!(21.25), dec!(74.35)));

        let capped = socso_step(dec!(10500), 30, ResidentStatus::Resident);
        assert_eq!((capped.ee, capped.er), (dec!(29.75), dec!(104.15)));

        let capped_relief = socso_step(dec!(5000), 30, ResidentStatus::Resident);
        assert_eq!(capped_relief.ee, dec!(24.75));
    }

    #[test]
    fn seniors_and_non_residents_only_pay_injury_category() {
        let senior = socso_step(dec!(3000), 60, ResidentStatus::Resident);
        assert_eq!(senior.ee, dec!(0));
        assert_eq!(senior.er, socso_row(dec!(3000)).er_injury_only);

        let foreign = socso_step(dec!(3000), 30, ResidentStatus::NonResident);
        assert_eq!(foreign.ee, dec!(0));
        assert!(foreign.er > dec!(0));
    }

    #[test]
    fn zero_wage_contributes_nothing() {
        assert_eq!(socso_step(dec!(0), 30, ResidentStatus::Resident), StepContribution::ZERO);
    }
}
