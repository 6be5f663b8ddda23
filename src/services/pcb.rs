// src/services/pcb.rs
//
// Monthly tax deduction (PCB). Normal remuneration is projected over the
// remaining months of the year; additional remuneration (commission, bonus)
// is taxed as the marginal difference it makes to annual tax.

use crate::{
    config::Ruleset,
    models::{MaritalStatus, YtdAccumulators},
    money::{ceil_to_step, non_negative, truncate_cents},
    rules::{TaxCategory, tax::bracket_tax},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcbInput {
    /// Payroll month, 1..=12.
    pub month: u32,
    /// Y1: basic salary (or part-time wage) for the month.
    pub normal_remuneration: Decimal,
    /// Yt: commission + bonus for the month.
    pub additional_remuneration: Decimal,
    /// K1: employee EPF on Y1 alone.
    pub epf_on_normal: Decimal,
    /// Kt: employee EPF attributable to Yt.
    pub epf_on_additional: Decimal,
    pub ytd: YtdAccumulators,
    pub current_zakat: Decimal,
    pub marital_status: MaritalStatus,
    pub spouse_working: bool,
    pub children: u32,
    pub disabled: bool,
    pub spouse_disabled: bool,
    /// This month's SOCSO employee share claimed as relief.
    pub socso_relief: Decimal,
    /// This month's EIS employee share claimed as relief.
    pub eis_relief: Decimal,
}

impl PcbInput {
    pub fn category(&self) -> TaxCategory {
        if self.marital_status == MaritalStatus::Married && !self.spouse_working {
            TaxCategory::MarriedSpouseNotWorking
        } else {
            TaxCategory::Single
        }
    }

    /// n: months left in the year including this one.
    pub fn remaining_months(&self) -> u32 {
        12 - self.month.clamp(1, 12) + 1
    }
}

/// Intermediate values, kept for payslip audit trails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcbBreakdown {
    pub remaining_months: u32,
    pub personal_reliefs: Decimal,
    pub epf_relief: Decimal,
    pub chargeable_income: Decimal,
    pub annual_tax: Decimal,
    pub normal_pcb: Decimal,
    pub additional_pcb: Decimal,
    pub pcb: Decimal,
}

/// Reliefs other than EPF: individual, spouse, children, disability and the
/// capped SOCSO/EIS claims.
fn personal_reliefs(input: &PcbInput, rules: &Ruleset) -> Decimal {
    let married = input.marital_status == MaritalStatus::Married;
    let mut total = rules.individual_relief;
    if married && !input.spouse_working {
        total += rules.spouse_relief;
    }
    total += rules.child_relief_each * Decimal::from(input.children);
    if input.disabled {
        total += rules.disabled_self_relief;
    }
    if married && input.spouse_disabled {
        total += rules.disabled_spouse_relief;
    }
    total += (input.ytd.socso_relief + input.socso_relief).min(rules.socso_relief_cap);
    total += (input.ytd.eis_relief + input.eis_relief).min(rules.eis_relief_cap);
    total
}

pub fn compute_pcb(input: &PcbInput, rules: &Ruleset) -> PcbBreakdown {
    let n = Decimal::from(input.remaining_months());
    let category = input.category();
    let reliefs = personal_reliefs(input, rules);

    let projected = input.ytd.gross + input.normal_remuneration * n;
    let projected_epf = input.ytd.epf + input.epf_on_normal * n;
    let epf_relief = projected_epf.min(rules.epf_relief_cap);

    let chargeable = non_negative(projected - epf_relief - reliefs);
    let annual_tax = bracket_tax(chargeable, category);
    let mut normal = non_negative((annual_tax - input.ytd.zakat - input.ytd.pcb) / n);

    let additional = if input.additional_remuneration > Decimal::ZERO {
        let epf_relief_with_additional =
            (projected_epf + input.epf_on_additional).min(rules.epf_relief_cap);
        let chargeable_with_additional = non_negative(
            projected + input.additional_remuneration - epf_relief_with_additional - reliefs,
        );
        let tax_with_additional = bracket_tax(chargeable_with_additional, category);
        non_negative(tax_with_additional - annual_tax - input.current_zakat)
    } else {
        // Without additional remuneration this month's zakat offsets the normal share.
        normal = non_negative(normal - input.current_zakat);
        Decimal::ZERO
    };

    let rounded = ceil_to_step(truncate_cents(normal + additional), rules.pcb_round_step);
    let pcb = if rounded < rules.pcb_min_payable {
        Decimal::ZERO
    } else {
        rounded
    };

    PcbBreakdown {
        remaining_months: input.remaining_months(),
        personal_reliefs: reliefs,
        epf_relief,
        chargeable_income: chargeable,
        annual_tax,
        normal_pcb: normal,
        additional_pcb: additional,
        pcb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(month: u32, y1: Decimal, yt: Decimal, k1: Decimal, kt: Decimal) -> PcbInput {
        PcbInput {
            month,
            normal_remuneration: y1,
            additional_remuneration: yt,
            epf_on_normal: k1,
            epf_on_additional: kt,
            ytd: YtdAccumulators::default(),
            current_zakat: dec!(0),
            marital_status: MaritalStatus::Single,
            spouse_working: false,
            children: 0,
            disabled: false,
            spouse_disabled: false,
            socso_relief: dec!(24.75),
            eis_relief: dec!(9.90),
        }
    }

    #[test]
    fn single_high_earner_january() {
        let b = compute_pcb(
            &input(1, dec!(10000), dec!(0), dec!(1100), dec!(0)),
            &Ruleset::default(),
        );
        assert_eq!(b.remaining_months, 12);
        assert_eq!(b.chargeable_income, dec!(106965.35));
        assert_eq!(b.pcb, dec!(928.45));
    }

    #[test]
    fn commission_is_taxed_as_additional_remuneration() {
        let b = compute_pcb(
            &input(1, dec!(4100), dec!(12878), dec!(451), dec!(1419)),
            &Ruleset::default(),
        );
        assert_eq!(b.additional_pcb, dec!(772.68));
        assert_eq!(b.pcb, dec!(828.50));
    }

    #[test]
    fn single_low_band() {
        let mut i = input(1, dec!(4300), dec!(0), dec!(473), dec!(0));
        i.socso_relief = dec!(21.25);
        i.eis_relief = dec!(8.50);
        let b = compute_pcb(&i, &Ruleset::default());
        assert_eq!(b.chargeable_income, dec!(38570.25));
        assert_eq!(b.pcb, dec!(67.85));
    }

    #[test]
    fn spouse_and_children_reliefs_remove_liability() {
        let mut i = input(1, dec!(4300), dec!(0), dec!(473), dec!(0));
        i.marital_status = MaritalStatus::Married;
        i.children = 2;
        i.socso_relief = dec!(21.25);
        i.eis_relief = dec!(8.50);
        let b = compute_pcb(&i, &Ruleset::default());
        assert_eq!(i.category(), TaxCategory::MarriedSpouseNotWorking);
        assert_eq!(b.chargeable_income, dec!(30570.25));
        assert_eq!(b.pcb, dec!(0));
    }

    #[test]
    fn amounts_below_minimum_are_waived() {
        let b = compute_pcb(
            &input(1, dec!(3600), dec!(0), dec!(396), dec!(0)),
            &Ruleset::default(),
        );
        assert!(b.normal_pcb > dec!(0));
        assert_eq!(b.pcb, dec!(0));
    }

    #[test]
    fn december_spreads_over_one_month() {
        let mut i = input(12, dec!(10000), dec!(0), dec!(1100), dec!(0));
        i.ytd = YtdAccumulators {
            gross: dec!(110000),
            epf: dec!(12100),
            pcb: dec!(10213.40),
            zakat: dec!(0),
            socso_relief: dec!(327.25),
            eis_relief: dec!(130.90),
        };
        let b = compute_pcb(&i, &Ruleset::default());
        assert_eq!(b.remaining_months, 1);
        assert_eq!(b.epf_relief, dec!(4000));
        // SOCSO relief saturates at 350 by December.
        assert_eq!(b.chargeable_income, dec!(106509.20));
        assert_eq!(b.pcb, dec!(813.90));
    }

    #[test]
    fn zakat_reduces_pcb_and_never_makes_it_negative() {
        let mut i = input(1, dec!(10000), dec!(0), dec!(1100), dec!(0));
        i.current_zakat = dec!(100);
        assert_eq!(compute_pcb(&i, &Ruleset::default()).pcb, dec!(828.45));

        i.current_zakat = dec!(5000);
        assert_eq!(compute_pcb(&i, &Ruleset::default()).pcb, dec!(0));
    }

    #[test]
    fn disability_reliefs_lower_chargeable_income() {
        let mut i = input(1, dec!(10000), dec!(0), dec!(1100), dec!(0));
        i.disabled = true;
        let b = compute_pcb(&i, &Ruleset::default());
        assert_eq!(b.chargeable_income, dec!(100965.35));
    }
}
