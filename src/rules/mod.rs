// src/rules/mod.rs
//
// Process-wide, read-only statutory tables.

pub mod eis;
pub mod epf;
pub mod holidays;
pub mod socso;
pub mod tax;

pub use eis::eis_step;
pub use epf::{EpfRates, epf_rates};
pub use holidays::{is_public_holiday, public_holidays_in, working_days_in_month};
pub use socso::{StepContribution, socso_step};
pub use tax::{TaxBracket, TaxCategory, tax_bracket};
