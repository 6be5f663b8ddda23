//! EPF (Third Schedule) rates and wage brackets.

use crate::{config::Ruleset, models::ResidentStatus, money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// From this age the employee share drops to zero and the employer pays 4%.
pub const EPF_SENIOR_AGE: u32 = 60;

/// Wages up to this amount attract no contribution at all.
const EPF_NIL_WAGE: Decimal = dec!(10.00);
/// Bracket width for wages up to the rate threshold.
const NARROW_BRACKET: Decimal = dec!(20);
/// Bracket width above the rate threshold.
const WIDE_BRACKET: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpfRates {
    pub ee_rate: Decimal,
    pub er_rate: Decimal,
    pub ceiling: Decimal,
}

/// Banded EPF rates for an employee of `age` earning `wage` this month.
pub fn epf_rates(age: u32, status: ResidentStatus, wage: Decimal, rules: &Ruleset) -> EpfRates {
    let (ee_rate, er_rate) = match status {
        ResidentStatus::NonResident => (dec!(0.02), dec!(0.02)),
        ResidentStatus::Resident if age >= EPF_SENIOR_AGE => (dec!(0), dec!(0.04)),
        ResidentStatus::Resident if wage <= rules.epf_rate_threshold => (dec!(0.11), dec!(0.13)),
        ResidentStatus::Resident => (dec!(0.11), dec!(0.12)),
    };

    EpfRates {
        ee_rate,
        er_rate,
        ceiling: rules.epf_ceiling,
    }
}

/// The wage actually contributed on: saturates at the ceiling.
pub fn epf_wage(statutory_base: Decimal, rules: &Ruleset) -> Decimal {
    money::non_negative(statutory_base.min(rules.epf_ceiling))
}

/// Upper bound of the schedule bracket containing `wage`.
pub fn bracket_wage(wage: Decimal, rules: &Ruleset) -> Decimal {
    if wage <= EPF_NIL_WAGE {
        return dec!(0);
    }
    if wage <= rules.epf_rate_threshold {
        money::ceil_to_bracket(wage, NARROW_BRACKET)
    } else {
        money::ceil_to_bracket(wage, WIDE_BRACKET)
    }
}

/// One side's contribution: rate applied to the bracket wage, rounded up to the ringgit.
pub fn contribution(wage: Decimal, rate: Decimal, rules: &Ruleset) -> Decimal {
    let bracket = bracket_wage(wage, rules);
    if bracket.is_zero() || rate.is_zero() {
        return dec!(0.00);
    }
    money::ceil_ringgit(bracket * rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Ruleset {
        Ruleset::default()
    }

    #[test]
    fn employer_rate_steps_down_above_threshold() {
        let low = epf_rates(35, ResidentStatus::Resident, dec!(5000), &rules());
        assert_eq!((low.ee_rate, low.er_rate), (dec!(0.11), dec!(0.13)));

        let high = epf_rates(35, ResidentStatus::Resident, dec!(5000.01), &rules());
        assert_eq!((high.ee_rate, high.er_rate), (dec!(0.11), dec!(0.12)));
        assert_eq!(high.ceiling, dec!(20000));
    }

    #[test]
    fn age_sixty_uses_senior_rates() {
        let senior = epf_rates(60, ResidentStatus::Resident, dec!(3000), &rules());
        assert_eq!((senior.ee_rate, senior.er_rate), (dec!(0), dec!(0.04)));

        let younger = epf_rates(59, ResidentStatus::Resident, dec!(3000), &rules());
        assert_eq!(younger.ee_rate, dec!(0.11));
    }

    #[test]
    fn non_residents_pay_flat_two_percent() {
        let rates = epf_rates(30, ResidentStatus::NonResident, dec!(3000), &rules());
        assert_eq!((rates.ee_rate, rates.er_rate), (dec!(0.02), dec!(0.02)));
    }

    #[test]
    fn wage_saturates_at_ceiling() {
        assert_eq!(epf_wage(dec!(20000), &rules()), dec!(20000));
        assert_eq!(epf_wage(dec!(45000), &rules()), dec!(20000));
        assert_eq!(epf_wage(dec!(4300), &rules()), dec!(4300));
    }

    #[test]
    fn contribution_uses_schedule_brackets() {
        let r = rules();
        assert_eq!(contribution(dec!(4300), dec!(0.11), &r), dec!(473));
        assert_eq!(contribution(dec!(4300), dec!(0.13), &r), dec!(559));
        assert_eq!(contribution(dec!(4281), dec!(0.11), &r), dec!(473));
        assert_eq!(contribution(dec!(16978), dec!(0.11), &r), dec!(1870));
        assert_eq!(contribution(dec!(16978), dec!(0.12), &r), dec!(2040));
        assert_eq!(contribution(dec!(20000), dec!(0.11), &r), dec!(2200));
    }

    #[test]
    fn tiny_wages_contribute_nothing() {
        assert_eq!(contribution(dec!(10), dec!(0.11), &rules()), dec!(0));
        assert_eq!(contribution(dec!(0), dec!(0.13), &rules()), dec!(0));
        assert_eq!(contribution(dec!(10.01), dec!(0.11), &rules()), dec!(3));
    }
}
