//! Resident individual tax schedule in the computerised-deduction (M, R, B) form.
//!
//! Annual tax on chargeable income `P` is `(P - M) * R + B`, where `B` is the
//! tax on `M` net of rebates. `b_single` applies to single employees and to
//! married employees whose spouse works; `b_married` applies when the spouse
//! does not work and carries an extra 400 rebate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxCategory {
    /// Single, or married with a working spouse.
    Single,
    /// Married, spouse not working.
    MarriedSpouseNotWorking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxBracket {
    /// Exclusive lower bound of chargeable income (`M`).
    pub m: Decimal,
    pub rate: Decimal,
    pub b_single: Decimal,
    pub b_married: Decimal,
}

#[rustfmt::skip]
pub const TAX_BRACKETS: &[TaxBracket] = &[
    TaxBracket { m: dec!(0), rate: dec!(0), b_single: dec!(0), b_married: dec!(-400) },
    TaxBracket { m: dec!(5000), rate: dec!(0.01), b_single: dec!(-400), b_married: dec!(-800) },
    TaxBracket { m: dec!(20000), rate: dec!(0.03), b_single: dec!(-250), b_married: dec!(-650) },
    TaxBracket { m: dec!(35000), rate: dec!(0.06), b_single: dec!(600), b_married: dec!(200) },
    TaxBracket { m: dec!(50000), rate: dec!(0.11), b_single: dec!(1500), b_married: dec!(1100) },
    TaxBracket { m: dec!(70000), rate: dec!(0.19), b_single: dec!(3700), b_married: dec!(3300) },
    TaxBracket { m: dec!(100000), rate: dec!(0.25), b_single: dec!(9400), b_married: dec!(9000) },
    TaxBracket { m: dec!(400000), rate: dec!(0.26), b_single: dec!(84400), b_married: dec!(84000) },
    TaxBracket { m: dec!(600000), rate: dec!(0.28), b_single: dec!(136400), b_married: dec!(136000) },
    TaxBracket { m: dec!(2000000), rate: dec!(0.30), b_single: dec!(528400), b_married: dec!(528000) },
];

/// The bracket whose range holds `chargeable_income`. Incomes exactly on a
/// threshold stay in the lower bracket.
pub fn tax_bracket(chargeable_income: Decimal) -> &'static TaxBracket {
    TAX_BRACKETS
        .iter()
        .rev()
        .find(|b| chargeable_income > b.m)
        .unwrap_or(&TAX_BRACKETS[0])
}

impl TaxBracket {
    pub fn b(&self, category: TaxCategory) -> Decimal {
        match category {
            TaxCategory::Single => self.b_single,
            TaxCategory::MarriedSpouseNotWorking => self.b_married,
        }
    }

    /// Annual tax before zakat and prior deductions; never negative.
    pub fn annual_tax(&self, chargeable_income: Decimal, category: TaxCategory) -> Decimal {
        ((chargeable_income - self.m) * self.rate + self.b(category)).max(Decimal::ZERO)
    }
}

/// Annual tax on `chargeable_income` using the bracket that holds it.
pub fn bracket_tax(chargeable_income: Decimal, category: TaxCategory) -> Decimal {
    if chargeable_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    tax_bracket(chargeable_income).annual_tax(chargeable_income, category)
}
