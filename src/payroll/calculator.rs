use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::{
    error::AppError,
    model::{
        allowance::Allowance,
        deduction::Deduction,
        payroll::{Payroll, PayrollAmounts, PayrollPatch},
        period::Period,
    },
    store::PayrollStore,
};

/// Derives the payroll components from one period's inputs. A missing
/// allowance or deduction row counts as zero.
pub fn compute(
    base_salary: Decimal,
    allowance: Option<&Allowance>,
    deduction: Option<&Deduction>,
) -> PayrollAmounts {
    PayrollAmounts::new(
        base_salary,
        allowance.map(Allowance::total).unwrap_or_default(),
        deduction.map(Deduction::total).unwrap_or_default(),
    )
}

/// Computes net salary for one employee and period and stores it,
/// replacing any earlier result for the same period.
///
/// Every lookup happens before the write, so a `NotFound` or
/// `Unprocessable` leaves the store untouched.
#[instrument(name = "payroll_calculate", skip(store))]
pub async fn calculate(
    store: &dyn PayrollStore,
    employee_id: u64,
    period: Period,
) -> Result<Payroll, AppError> {
    let employee = store
        .find_employee(employee_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Employee {employee_id} does not exist")))?;

    let no_salary = || {
        AppError::unprocessable(format!(
            "Employee {employee_id} has no configured salary for their role"
        ))
    };
    let position_id = employee.position_id.ok_or_else(no_salary)?;
    let position = store
        .find_position(position_id)
        .await?
        .ok_or_else(no_salary)?;

    let allowance = store.find_allowance(employee_id, period).await?;
    let deduction = store.find_deduction(employee_id, period).await?;
    debug!(
        position_id,
        has_allowance = allowance.is_some(),
        has_deduction = deduction.is_some(),
        "Inputs loaded"
    );

    let amounts = compute(position.base_salary, allowance.as_ref(), deduction.as_ref());
    let payroll = store.upsert_payroll(employee_id, period, &amounts).await?;

    info!(
        payroll_id = payroll.id,
        net_salary = %payroll.net_salary,
        "Payroll calculated"
    );
    Ok(payroll)
}

/// Operator edit of a stored row. The patch is validated before the store
/// sees it and net salary is re-derived from the result.
#[instrument(name = "payroll_amend", skip(store, patch))]
pub async fn amend(
    store: &dyn PayrollStore,
    payroll_id: u64,
    patch: &PayrollPatch,
) -> Result<Payroll, AppError> {
    patch.validate()?;

    let payroll = store
        .patch_payroll(payroll_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll record not found"))?;

    info!(net_salary = %payroll.net_salary, "Payroll amended");
    Ok(payroll)
}
