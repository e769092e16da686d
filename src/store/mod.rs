//! Record store seams. Handlers and the payroll component only see these
//! traits; `MySqlStore` is the production implementation.

use async_trait::async_trait;

use crate::{
    error::AppError,
    model::{
        allowance::Allowance,
        deduction::Deduction,
        employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
        payroll::{Payroll, PayrollAmounts, PayrollLine, PayrollPatch, PayslipDetail},
        period::Period,
        position::Position,
        role::Role,
        user::User,
    },
};

pub mod mysql;

pub use mysql::MySqlStore;

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError>;

    async fn find_position(&self, position_id: u64) -> Result<Option<Position>, AppError>;

    async fn find_allowance(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Allowance>, AppError>;

    async fn find_deduction(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Deduction>, AppError>;

    /// Inserts or replaces the single payroll row for (employee, period).
    /// Atomic: concurrent calls for the same key leave exactly one row
    /// holding the values of the last commit.
    async fn upsert_payroll(
        &self,
        employee_id: u64,
        period: Period,
        amounts: &PayrollAmounts,
    ) -> Result<Payroll, AppError>;

    /// All payroll lines, or only those of one employee.
    async fn list_payroll_lines(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<PayrollLine>, AppError>;

    async fn find_payslip(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<PayslipDetail>, AppError>;

    async fn find_payroll(&self, payroll_id: u64) -> Result<Option<Payroll>, AppError>;

    /// Applies `patch` to the locked row and recomputes net salary.
    /// `None` when the row does not exist.
    async fn patch_payroll(
        &self,
        payroll_id: u64,
        patch: &PayrollPatch,
    ) -> Result<Option<Payroll>, AppError>;

    async fn delete_payroll(&self, payroll_id: u64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    /// Returns one page of matching employees and the total match count.
    async fn list_employees(&self, query: &EmployeeQuery) -> Result<(Vec<Employee>, i64), AppError>;

    async fn get_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError>;

    /// Fails with `Conflict` when the email is already registered.
    async fn create_employee(&self, new: &CreateEmployee) -> Result<Employee, AppError>;

    async fn update_employee(
        &self,
        employee_id: u64,
        patch: &UpdateEmployee,
    ) -> Result<Option<Employee>, AppError>;

    async fn delete_employee(&self, employee_id: u64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, user_id: u64) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        employee_id: Option<u64>,
    ) -> Result<u64, AppError>;

    async fn set_password(&self, user_id: u64, password_hash: &str) -> Result<(), AppError>;

    async fn touch_last_login(&self, user_id: u64) -> Result<(), AppError>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: usize,
    ) -> Result<(), AppError>;

    /// Revokes a live refresh token and returns its owner. `None` when the
    /// token is unknown or already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, AppError>;
}
