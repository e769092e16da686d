use crate::{error::AppError, model::role::Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// Verified caller identity. Inserted into request extensions by
/// `auth_middleware`; handlers receive it by extraction and never read role
/// or employee id from the request itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(AppError::forbidden("HR/Admin only"))
        }
    }

    pub fn require_elevated(&self) -> Result<(), AppError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin/HR/Accountant only"))
        }
    }

    /// Elevated callers may act on any employee; everyone else only on the
    /// employee record linked to their account.
    pub fn require_self_or_elevated(&self, employee_id: u64) -> Result<(), AppError> {
        if self.role.is_elevated() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You may only access your own payroll"))
        }
    }
}
