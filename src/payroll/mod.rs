//! Payroll calculation and reporting over a `PayrollStore`.

pub mod calculator;
pub mod reporter;
