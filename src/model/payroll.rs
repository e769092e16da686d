use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::period::Period;
use crate::error::AppError;

/// Rounds to currency precision and fixes the scale at two places.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Stored payroll row, one per (employee_id, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payroll {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "2024-03", value_type = String)]
    pub month: Period,

    #[schema(example = "10000000.00", value_type = String)]
    pub base_salary: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_allowance: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_deduction: Decimal,

    #[schema(example = "10000000.00", value_type = String)]
    pub net_salary: Decimal,
}

impl Payroll {
    pub fn amounts(&self) -> PayrollAmounts {
        PayrollAmounts {
            base_salary: self.base_salary,
            total_allowance: self.total_allowance,
            total_deduction: self.total_deduction,
        }
    }
}

/// The three components net salary is derived from. Net salary is never
/// stored independently of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollAmounts {
    pub base_salary: Decimal,
    pub total_allowance: Decimal,
    pub total_deduction: Decimal,
}

impl PayrollAmounts {
    pub fn new(base_salary: Decimal, total_allowance: Decimal, total_deduction: Decimal) -> Self {
        Self {
            base_salary: money(base_salary),
            total_allowance: money(total_allowance),
            total_deduction: money(total_deduction),
        }
    }

    /// May be negative when deductions exceed pay.
    pub fn net_salary(&self) -> Decimal {
        money(self.base_salary + self.total_allowance - self.total_deduction)
    }
}

/// Operator edit of a stored payroll row. Fields left out keep their
/// stored value; net salary is always recomputed.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PayrollPatch {
    #[schema(example = "10500000.00", value_type = Option<String>)]
    pub base_salary: Option<Decimal>,

    #[schema(example = "800000.00", value_type = Option<String>)]
    pub total_allowance: Option<Decimal>,

    #[schema(example = "650000.00", value_type = Option<String>)]
    pub total_deduction: Option<Decimal>,
}

impl PayrollPatch {
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("base_salary", self.base_salary),
            ("total_allowance", self.total_allowance),
            ("total_deduction", self.total_deduction),
        ];

        if fields.iter().all(|(_, v)| v.is_none()) {
            return Err(AppError::unprocessable("No fields provided for update"));
        }

        for (name, value) in fields {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(AppError::unprocessable(format!(
                    "{name} must not be negative"
                )));
            }
        }

        Ok(())
    }

    pub fn apply(&self, current: &PayrollAmounts) -> PayrollAmounts {
        PayrollAmounts::new(
            self.base_salary.unwrap_or(current.base_salary),
            self.total_allowance.unwrap_or(current.total_allowance),
            self.total_deduction.unwrap_or(current.total_deduction),
        )
    }
}

/// Flat report row: payroll joined with the owning employee's name.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollLine {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "Nguyen Van A")]
    pub full_name: String,

    #[schema(example = "2024-03", value_type = String)]
    pub month: Period,

    #[schema(example = "10000000.00", value_type = String)]
    pub base_salary: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_allowance: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_deduction: Decimal,

    #[schema(example = "10000000.00", value_type = String)]
    pub net_salary: Decimal,
}

/// One period's payroll enriched with employee, department and position
/// display fields.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayslipDetail {
    #[schema(example = 1)]
    pub payroll_id: u64,

    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "Nguyen Van A")]
    pub full_name: String,

    #[schema(example = "Engineering", nullable = true)]
    pub department_name: Option<String>,

    #[schema(example = "Backend Developer", nullable = true)]
    pub position_name: Option<String>,

    #[schema(example = "2024-03", value_type = String)]
    pub month: Period,

    #[schema(example = "10000000.00", value_type = String)]
    pub base_salary: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_allowance: Decimal,

    #[schema(example = "700000.00", value_type = String)]
    pub total_deduction: Decimal,

    #[schema(example = "10000000.00", value_type = String)]
    pub net_salary: Decimal,
}
