use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "full_name": "Nguyen Van A",
        "email": "a.nguyen@company.com",
        "phone": "+84901234567",
        "department_id": 10,
        "position_id": 3,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Nguyen Van A")]
    pub full_name: String,

    #[schema(example = "a.nguyen@company.com")]
    pub email: String,

    #[schema(example = "+84901234567", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    /// Without a position the employee has no configured base salary.
    #[schema(example = 3, nullable = true)]
    pub position_id: Option<u64>,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Nguyen Van A")]
    pub full_name: String,
    #[schema(example = "a.nguyen@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+84901234567", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = 2, nullable = true)]
    pub position_id: Option<u64>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = "active", nullable = true)]
    pub status: Option<String>,
}

impl CreateEmployee {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::unprocessable("full_name must not be empty"));
        }
        validate_email(&self.email)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page, at most 100
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub position_id: Option<u64>,
    pub status: Option<String>,
    /// Matches full name or email
    pub search: Option<String>,
}

impl EmployeeQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.per_page()
    }
}

/// Typed partial update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmployee {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<u64>,
    pub position_id: Option<u64>,
    pub status: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
}

impl UpdateEmployee {
    pub fn validate(&self) -> Result<(), AppError> {
        let empty = self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.department_id.is_none()
            && self.position_id.is_none()
            && self.status.is_none()
            && self.hire_date.is_none();
        if empty {
            return Err(AppError::unprocessable("No fields provided for update"));
        }
        if matches!(&self.full_name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::unprocessable("full_name must not be empty"));
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::unprocessable(format!("Invalid email '{email}'"))),
    }
}
