pub mod allowance;
pub mod deduction;
pub mod employee;
pub mod payroll;
pub mod period;
pub mod position;
pub mod role;
pub mod user;
