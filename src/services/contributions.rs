// src/services/contributions.rs

use crate::{
    config::Ruleset,
    models::ResidentStatus,
    rules::{
        StepContribution, eis_step,
        epf::{self, epf_rates},
        socso_step,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionInput {
    /// basic + commission + bonus
    pub statutory_base: Decimal,
    /// statutory base + fixed allowance + overtime
    pub gross_wage: Decimal,
    pub age: u32,
    pub resident_status: ResidentStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributions {
    pub epf: StepContribution,
    pub socso: StepContribution,
    pub eis: StepContribution,
}

impl Contributions {
    pub fn employee_total(&self) -> Decimal {
        self.epf.ee + self.socso.ee + self.eis.ee
    }

    pub fn employer_total(&self) -> Decimal {
        self.epf.er + self.socso.er + self.eis.er
    }
}

/// EPF, SOCSO and EIS for one employee-month.
pub fn compute_contributions(input: &ContributionInput, rules: &Ruleset) -> Contributions {
    if input.gross_wage <= Decimal::ZERO {
        return Contributions::default();
    }

    let epf_wage = epf::epf_wage(input.statutory_base, rules);
    let rates = epf_rates(input.age, input.resident_status, epf_wage, rules);
    let epf = StepContribution {
        ee: epf::contribution(epf_wage, rates.ee_rate, rules),
        er: epf::contribution(epf_wage, rates.er_rate, rules),
    };

    Contributions {
        epf,
        socso: socso_step(input.gross_wage, input.age, input.resident_status),
        eis: eis_step(input.gross_wage, input.age, input.resident_status),
    }
}

/// Employee EPF attributable to `remuneration` alone, at the rate band the
/// whole month's statutory base falls in. Used to split K1 from Kt.
pub fn epf_employee_share(
    remuneration: Decimal,
    statutory_base: Decimal,
    age: u32,
    status: ResidentStatus,
    rules: &Ruleset,
) -> Decimal {
    let rates = epf_rates(age, status, epf::epf_wage(statutory_base, rules), rules);
    epf::contribution(epf::epf_wage(remuneration, rules), rates.ee_rate, rules)
}

/// SOCSO and EIS employee shares as claimed for tax relief this month: the
/// step-table values at the gross wage capped at `socso_eis_ceiling`.
pub fn relief_contributions(
    gross_wage: Decimal,
    age: u32,
    status: ResidentStatus,
    rules: &Ruleset,
) -> (Decimal, Decimal) {
    let capped = gross_wage.min(rules.socso_eis_ceiling);
    (
        socso_step(capped, age, status).ee,
        eis_step(capped, age, status).ee,
    )
}
