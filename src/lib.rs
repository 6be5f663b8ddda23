//! Payroll and attendance kernel for Malaysian employers: statutory
//! contributions (EPF, SOCSO, EIS), monthly tax deduction (PCB), the selfie
//! and GPS clock-in state machine, and retention of captured media.

pub mod config;
pub mod errors;
pub mod identity;
pub mod models;
pub mod money;
pub mod repository;
pub mod rules;
pub mod services;
pub mod state;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use services::{
    attendance::{AttendanceService, ClockEventRequest, compute_daily_totals},
    contributions::compute_contributions,
    payroll::{PayPeriod, PayrollService},
    pcb::compute_pcb,
    retention::run_retention_sweep,
};
