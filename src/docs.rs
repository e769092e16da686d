use crate::api::employee::EmployeeListResponse;
use crate::api::payroll::{CalculatePayroll, PayrollReport, PayrollResult};
use crate::auth::auth::AuthUser;
use crate::model::employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee};
use crate::model::payroll::{Payroll, PayrollLine, PayrollPatch, PayslipDetail};
use crate::model::role::Role;
use crate::models::{ChangePasswordReq, LoginReqDto, RegisterUserReq, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) Payroll

Employee records plus monthly payroll: net salary is computed per
employee and month as `base salary + allowances - deductions` and stored
once per (employee, month).

### 🔹 Key Features
- **Payroll**
  - Calculate (or recalculate) a month, list payroll lines, view payslips
  - Admin corrections with net salary recomputed
- **Employee Management**
  - Create, update, list, view and delete employee profiles
- **Identity**
  - Login, refresh token rotation, logout, password change

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Employees only see their own payroll; Admin, HR and Accountant see all.

### 📦 Response Format
- Money values are decimal strings with two places
- Months are `YYYY-MM`
- Errors are `{"status": <category>, "error": <reason>}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::health::health,

        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::register,
        crate::auth::handlers::change_password,
        crate::auth::handlers::me,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::payroll::calculate,
        crate::api::payroll::report,
        crate::api::payroll::payslip,
        crate::api::payroll::get_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::delete_payroll
    ),
    components(
        schemas(
            LoginReqDto,
            RegisterUserReq,
            ChangePasswordReq,
            TokenPair,
            AuthUser,
            Role,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            Employee,
            EmployeeListResponse,
            CalculatePayroll,
            PayrollResult,
            PayrollReport,
            PayrollLine,
            PayslipDetail,
            Payroll,
            PayrollPatch
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Authentication and accounts"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payroll", description = "Payroll calculation and reporting APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
