use tracing::{debug, instrument};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        payroll::{PayrollLine, PayslipDetail},
        period::Period,
    },
    store::PayrollStore,
};

/// Lists stored payroll lines visible to the caller: employees see their own
/// lines, elevated roles see everyone's.
#[instrument(name = "payroll_report", skip_all, fields(user_id = caller.user_id))]
pub async fn report(
    store: &dyn PayrollStore,
    caller: &AuthUser,
) -> Result<Vec<PayrollLine>, AppError> {
    let scope = if caller.role.is_elevated() {
        None
    } else {
        let employee_id = caller
            .employee_id
            .ok_or_else(|| AppError::forbidden("Account is not linked to an employee"))?;
        Some(employee_id)
    };

    let lines = store.list_payroll_lines(scope).await?;
    debug!(count = lines.len(), scoped = scope.is_some(), "Report built");
    Ok(lines)
}

/// Payslip of one employee for one period.
#[instrument(name = "payroll_payslip", skip(store, caller), fields(user_id = caller.user_id))]
pub async fn payslip(
    store: &dyn PayrollStore,
    caller: &AuthUser,
    employee_id: u64,
    period: Period,
) -> Result<PayslipDetail, AppError> {
    caller.require_self_or_elevated(employee_id)?;

    store
        .find_payslip(employee_id, period)
        .await?
        .ok_or_else(|| AppError::not_found("Payslip not found"))
}
