use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        payroll::{Payroll, PayrollLine, PayrollPatch},
        period::Period,
    },
    payroll::{calculator, reporter},
    store::PayrollStore,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculatePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    /// `YYYY-MM`, or any date inside the month
    #[schema(example = "2024-03", value_type = String)]
    pub month: Period,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayrollResult {
    #[schema(example = "success")]
    pub status: String,

    #[schema(example = "Payroll calculated")]
    pub message: String,

    #[schema(example = 1)]
    pub payroll_id: u64,

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

impl From<Payroll> for PayrollResult {
    fn from(p: Payroll) -> Self {
        PayrollResult {
            status: "success".to_string(),
            message: "Payroll calculated".to_string(),
            payroll_id: p.id,
            employee_id: p.employee_id,
            month: p.month,
            base_salary: p.base_salary,
            total_allowance: p.total_allowance,
            total_deduction: p.total_deduction,
            net_salary: p.net_salary,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PayrollReport {
    pub data: Vec<PayrollLine>,
    #[schema(example = 3)]
    pub total: usize,
}

/// Calculate and store net salary for one employee and month
#[utoipa::path(
    post,
    path = "/api/payroll/calculate",
    request_body = CalculatePayroll,
    responses(
        (status = 200, description = "Payroll calculated", body = PayrollResult),
        (status = 403, description = "Admin/HR/Accountant only"),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "No configured salary or malformed month"),
        (status = 500, description = "Storage failure, nothing saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn calculate(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    payload: web::Json<CalculatePayroll>,
) -> Result<HttpResponse, AppError> {
    auth.require_elevated()?;

    let payroll = calculator::calculate(store.get_ref(), payload.employee_id, payload.month).await?;

    Ok(HttpResponse::Ok().json(PayrollResult::from(payroll)))
}

/// Stored payroll lines visible to the caller
#[utoipa::path(
    get,
    path = "/api/payroll/report",
    responses(
        (status = 200, description = "Payroll lines, newest month first", body = PayrollReport),
        (status = 403, description = "Account is not linked to an employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn report(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
) -> Result<HttpResponse, AppError> {
    let data = reporter::report(store.get_ref(), &auth).await?;

    Ok(HttpResponse::Ok().json(PayrollReport {
        total: data.len(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/payslip/{employee_id}/{month}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("month", Path, description = "Month as YYYY-MM")
    ),
    responses(
        (status = 200, description = "Payslip", body = PayslipDetail),
        (status = 403, description = "Not your payslip"),
        (status = 404, description = "Payslip not found"),
        (status = 422, description = "Malformed month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn payslip(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    path: web::Path<(u64, String)>,
) -> Result<HttpResponse, AppError> {
    let (employee_id, month) = path.into_inner();
    let period: Period = month.parse()?;

    let slip = reporter::payslip(store.get_ref(), &auth, employee_id, period).await?;

    Ok(HttpResponse::Ok().json(slip))
}

#[utoipa::path(
    get,
    path = "/api/admin/payroll/{payroll_id}",
    params(
        ("payroll_id", Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, body = Payroll),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    match store.find_payroll(path.into_inner()).await? {
        Some(payroll) => Ok(HttpResponse::Ok().json(payroll)),
        None => Err(AppError::not_found("Payroll record not found")),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/payroll/{payroll_id}",
    request_body = PayrollPatch,
    params(
        ("payroll_id", Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll updated, net salary recomputed", body = Payroll),
        (status = 404, description = "Payroll record not found"),
        (status = 422, description = "Empty patch or negative amount")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
#[instrument(name = "payroll_update", skip(auth, store, body))]
pub async fn update_payroll(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    path: web::Path<u64>,
    body: web::Json<PayrollPatch>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let payroll = calculator::amend(store.get_ref(), path.into_inner(), &body).await?;

    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    delete,
    path = "/api/admin/payroll/{payroll_id}",
    params(
        ("payroll_id", Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
#[instrument(name = "payroll_delete", skip(auth, store))]
pub async fn delete_payroll(
    auth: AuthUser,
    store: web::Data<dyn PayrollStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    if !store.delete_payroll(path.into_inner()).await? {
        return Err(AppError::not_found("Payroll record not found"));
    }

    info!("Payroll deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
