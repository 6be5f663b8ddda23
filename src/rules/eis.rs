//! EIS (Employment Insurance System) contribution steps.

use crate::{models::ResidentStatus, rules::socso::StepContribution};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// From this age neither side contributes.
pub const EIS_EXIT_AGE: u32 = 57;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EisRow {
    pub max: Decimal,
    pub ee: Decimal,
    pub er: Decimal,
}

#[rustfmt::skip]
pub const EIS_TABLE: &[EisRow] = &[
    EisRow { max: dec!(30), ee: dec!(0.05), er: dec!(0.05) },
    EisRow { max: dec!(50), ee: dec!(0.10), er: dec!(0.10) },
    EisRow { max: dec!(70), ee: dec!(0.15), er: dec!(0.15) },
    EisRow { max: dec!(100), ee: dec!(0.20), er: dec!(0.20) },
    EisRow { max: dec!(140), ee: dec!(0.25), er: dec!(0.25) },
    EisRow { max: dec!(200), ee: dec!(0.35), er: dec!(0.35) },
    EisRow { max: dec!(300), ee: dec!(0.50), er: dec!(0.50) },
    EisRow { max: dec!(400), ee: dec!(0.70), er: dec!(0.70) },
    EisRow { max: dec!(500), ee: dec!(0.90), er: dec!(0.90) },
    EisRow { max: dec!(600), ee: dec!(1.10), er: dec!(1.10) },
    EisRow { max: dec!(700), ee: dec!(1.30), er: dec!(1.30) },
    EisRow { max: dec!(800), ee: dec!(1.50), er: dec!(1.50) },
    EisRow { max: dec!(900), ee: dec!(1.70), er: dec!(1.70) },
    EisRow { max: dec!(1000), ee: dec!(1.90), er: dec!(1.90) },
    EisRow { max: dec!(1100), ee: dec!(2.10), er: dec!(2.10) },
    EisRow { max: dec!(1200), ee: dec!(2.30), er: dec!(2.30) },
    EisRow { max: dec!(1300), ee: dec!(2.50), er: dec!(2.50) },
    EisRow { max: dec!(1400), ee: dec!(2.70), er: dec!(2.70) },
    EisRow { max: dec!(1500), ee: dec!(2.90), er: dec!(2.90) },
    EisRow { max: dec!(1600), ee: dec!(3.10), er: dec!(3.10) },
    EisRow { max: dec!(1700), ee: dec!(3.30), er: dec!(3.30) },
    EisRow { max: dec!(1800), ee: dec!(3.50), er: dec!(3.50) },
    EisRow { max: dec!(1900), ee: dec!(3.70), er: dec!(3.70) },
    EisRow { max: dec!(2000), ee: dec!(3.90), er: dec!(3.90) },
    EisRow { max: dec!(2100), ee: dec!(4.10), er: dec!(4.10) },
    EisRow { max: dec!(2200), ee: dec!(4.30), er: dec!(4.30) },
    EisRow { max: dec!(2300), ee: dec!(4.50), er: dec!(4.50) },
    EisRow { max: dec!(2400), ee: dec!(4.70), er: dec!(4.70) },
    EisRow { max: dec!(2500), ee: dec!(4.90), er: dec!(4.90) },
    EisRow { max: dec!(2600), ee: dec!(5.10), er: dec!(5.10) },
    EisRow { max: dec!(2700), ee: dec!(5.30), er: dec!(5.30) },
    EisRow { max: dec!(2800), ee: dec!(5.50), er: dec!(5.50) },
    EisRow { max: dec!(2900), ee: dec!(5.70), er: dec!(5.70) },
    EisRow { max: dec!(3000), ee: dec!(5.90), er: dec!(5.90) },
    EisRow { max: dec!(3100), ee: dec!(6.10), er: dec!(6.10) },
    EisRow { max: dec!(3200), ee: dec!(6.30), er: dec!(6.30) },
    EisRow { max: dec!(3300), ee: dec!(6.50), er: dec!(6.50) },
    EisRow { max: dec!(3400), ee: dec!(6.70), er: dec!(6.70) },
    EisRow { max: dec!(3500), ee: dec!(6.90), er: dec!(6.90) },
    EisRow { max: dec!(3600), ee: dec!(7.10), er: dec!(7.10) },
    EisRow { max: dec!(3700), ee: dec!(7.30), er: dec!(7.30) },
    EisRow { max: dec!(3800), ee: dec!(7.50), er: dec!(7.50) },
    EisRow { max: dec!(3900), ee: dec!(7.70), er: dec!(7.70) },
    EisRow { max: dec!(4000), ee: dec!(7.90), er: dec!(7.90) },
    EisRow { max: dec!(4100), ee: dec!(8.10), er: dec!(8.10) },
    EisRow { max: dec!(4200), ee: dec!(8.30), er: dec!(8.30) },
    EisRow { max: dec!(4300), ee: dec!(8.50), er: dec!(8.50) },
    EisRow { max: dec!(4400), ee: dec!(8.70), er: dec!(8.70) },
    EisRow { max: dec!(4500), ee: dec!(8.90), er: dec!(8.90) },
    EisRow { max: dec!(4600), ee: dec!(9.10), er: dec!(9.10) },
    EisRow { max: dec!(4700), ee: dec!(9.30), er: dec!(9.30) },
    EisRow { max: dec!(4800), ee: dec!(9.50), er: dec!(9.50) },
    EisRow { max: dec!(4900), ee: dec!(9.70), er: dec!(9.70) },
    EisRow { max: dec!(5000), ee: dec!(9.90), er: dec!(9.90) },
    EisRow { max: dec!(5100), ee: dec!(10.10), er: dec!(10.10) },
    EisRow { max: dec!(5200), ee: dec!(10.30), er: dec!(10.30) },
    EisRow { max: dec!(5300), ee: dec!(10.50), er: dec!(10.50) },
    EisRow { max: dec!(5400), ee: dec!(10.70), er: dec!(10.70) },
    EisRow { max: dec!(5500), ee: dec!(10.90), er: dec!(10.90) },
    EisRow { max: dec!(5600), ee: dec!(11.10), er: dec!(11.10) },
    EisRow { max: dec!(5700), ee: dec!(11.30), er: dec!(11.30) },
    EisRow { max: dec!(5800), ee: dec!(11.50), er: dec!(11.50) },
    EisRow { max: dec!(5900), ee: dec!(11.70), er: dec!(11.70) },
    EisRow { max: dec!(6000), ee: dec!(11.90), er: dec!(11.90) },
];

pub fn eis_ceiling() -> Decimal {
    EIS_TABLE[EIS_TABLE.len() - 1].max
}

pub fn eis_index(wage: Decimal) -> usize {
    EIS_TABLE
        .iter()
        .position(|row| wage <= row.max)
        .unwrap_or(EIS_TABLE.len() - 1)
}

pub fn eis_row(wage: Decimal) -> &'static EisRow {
    &EIS_TABLE[eis_index(wage)]
}

/// Contribution pair for `wage`; zero from age 57 and for non-residents.
pub fn eis_step(wage: Decimal, age: u32, status: ResidentStatus) -> StepContribution {
    if wage <= Decimal::ZERO || age >= EIS_EXIT_AGE || status == ResidentStatus::NonResident {
        return StepContribution::ZERO;
    }
    let row = eis_row(wage);
    StepContribution {
        ee: row.ee,
        er: row.er,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_schedule_values() {
        assert_eq!(eis_step(dec!(4300), 30, ResidentStatus::Resident).ee, dec!(8.50));
        assert_eq!(eis_step(dec!(10500), 30, ResidentStatus::Resident).er, dec!(11.90));
        assert_eq!(eis_step(dec!(5000), 30, ResidentStatus::Resident).ee, dec!(9.90));
        assert_eq!(eis_ceiling(), dec!(6000));
    }

    #[test]
    fn age_57_exits_the_scheme() {
        assert_eq!(eis_step(dec!(3000), 57, ResidentStatus::Resident), StepContribution::ZERO);
        assert_ne!(eis_step(dec!(3000), 56, ResidentStatus::Resident), StepContribution::ZERO);
    }

    #[test]
    fn boundary_jumps_to_next_bracket() {
        for pair in EIS_TABLE.windows(2) {
            let at_max = eis_step(pair[0].max, 30, ResidentStatus::Resident);
            let above = eis_step(pair[0].max + dec!(0.01), 30, ResidentStatus::Resident);
            assert_eq!(at_max.ee, pair[0].ee);
            assert_eq!(above.ee, pair[1].ee);
        }
    }
}
