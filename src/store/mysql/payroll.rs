use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, QueryBuilder};
use tracing::debug;

use super::MySqlStore;
use crate::{
    error::AppError,
    model::{
        allowance::Allowance,
        deduction::Deduction,
        employee::Employee,
        payroll::{Payroll, PayrollAmounts, PayrollLine, PayrollPatch, PayslipDetail},
        period::Period,
        position::Position,
    },
    store::PayrollStore,
};

const PAYROLL_COLUMNS: &str =
    "id, employee_id, month, base_salary, total_allowance, total_deduction, net_salary";

#[derive(FromRow)]
struct PayrollRow {
    id: u64,
    employee_id: u64,
    month: NaiveDate,
    base_salary: Decimal,
    total_allowance: Decimal,
    total_deduction: Decimal,
    net_salary: Decimal,
}

impl From<PayrollRow> for Payroll {
    fn from(row: PayrollRow) -> Self {
        Payroll {
            id: row.id,
            employee_id: row.employee_id,
            month: Period::from_date(row.month),
            base_salary: row.base_salary,
            total_allowance: row.total_allowance,
            total_deduction: row.total_deduction,
            net_salary: row.net_salary,
        }
    }
}

#[derive(FromRow)]
struct PayrollLineRow {
    employee_id: u64,
    full_name: String,
    month: NaiveDate,
    base_salary: Decimal,
    total_allowance: Decimal,
    total_deduction: Decimal,
    net_salary: Decimal,
}

impl From<PayrollLineRow> for PayrollLine {
    fn from(row: PayrollLineRow) -> Self {
        PayrollLine {
            employee_id: row.employee_id,
            full_name: row.full_name,
            month: Period::from_date(row.month),
            base_salary: row.base_salary,
            total_allowance: row.total_allowance,
            total_deduction: row.total_deduction,
            net_salary: row.net_salary,
        }
    }
}

#[derive(FromRow)]
struct PayslipRow {
    payroll_id: u64,
    employee_id: u64,
    full_name: String,
    department_name: Option<String>,
    position_name: Option<String>,
    month: NaiveDate,
    base_salary: Decimal,
    total_allowance: Decimal,
    total_deduction: Decimal,
    net_salary: Decimal,
}

impl From<PayslipRow> for PayslipDetail {
    fn from(row: PayslipRow) -> Self {
        PayslipDetail {
            payroll_id: row.payroll_id,
            employee_id: row.employee_id,
            full_name: row.full_name,
            department_name: row.department_name,
            position_name: row.position_name,
            month: Period::from_date(row.month),
            base_salary: row.base_salary,
            total_allowance: row.total_allowance,
            total_deduction: row.total_deduction,
            net_salary: row.net_salary,
        }
    }
}

#[async_trait]
impl PayrollStore for MySqlStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, full_name, email, phone, department_id, position_id, hire_date, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn find_position(&self, position_id: u64) -> Result<Option<Position>, AppError> {
        let position = sqlx::query_as::<_, Position>(
            "SELECT id, name, base_salary FROM positions WHERE id = ?",
        )
        .bind(position_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(position)
    }

    async fn find_allowance(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Allowance>, AppError> {
        let allowance = sqlx::query_as::<_, Allowance>(
            r#"
            SELECT id, employee_id, month, allowance, bonus
            FROM allowances
            WHERE employee_id = ? AND month = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(period.first_day())
        .fetch_optional(&self.pool)
        .await?;

        Ok(allowance)
    }

    async fn find_deduction(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Deduction>, AppError> {
        let deduction = sqlx::query_as::<_, Deduction>(
            r#"
            SELECT id, employee_id, month, insurance, tax, other
            FROM deductions
            WHERE employee_id = ? AND month = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(period.first_day())
        .fetch_optional(&self.pool)
        .await?;

        Ok(deduction)
    }

    async fn upsert_payroll(
        &self,
        employee_id: u64,
        period: Period,
        amounts: &PayrollAmounts,
    ) -> Result<Payroll, AppError> {
        let month = period.first_day();
        let net_salary = amounts.net_salary();

        // Dropping `tx` on any early return rolls the whole upsert back.
        let mut tx = self.pool.begin().await?;

        // Lock the employee row so same-employee calculations serialise
        // even when no payroll row exists yet to lock.
        let locked: Option<u64> =
            sqlx::query_scalar("SELECT id FROM employees WHERE id = ? FOR UPDATE")
                .bind(employee_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::not_found(format!("Employee {employee_id} does not exist")));
        }

        let existing: Option<u64> = sqlx::query_scalar(
            "SELECT id FROM payrolls WHERE employee_id = ? AND month = ? FOR UPDATE",
        )
        .bind(employee_id)
        .bind(month)
        .fetch_optional(&mut *tx)
        .await?;

        let payroll_id = match existing {
            Some(id) => {
                debug!(payroll_id = id, employee_id, %period, "Replacing payroll row");
                sqlx::query(
                    r#"
                    UPDATE payrolls
                    SET base_salary = ?, total_allowance = ?, total_deduction = ?, net_salary = ?
                    WHERE id = ?
                    "#,
                )
                .bind(amounts.base_salary)
                .bind(amounts.total_allowance)
                .bind(amounts.total_deduction)
                .bind(net_salary)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                debug!(employee_id, %period, "Inserting payroll row");
                sqlx::query(
                    r#"
                    INSERT INTO payrolls
                    (employee_id, month, base_salary, total_allowance, total_deduction, net_salary)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(employee_id)
                .bind(month)
                .bind(amounts.base_salary)
                .bind(amounts.total_allowance)
                .bind(amounts.total_deduction)
                .bind(net_salary)
                .execute(&mut *tx)
                .await?
                .last_insert_id()
            }
        };

        tx.commit().await?;

        Ok(Payroll {
            id: payroll_id,
            employee_id,
            month: period,
            base_salary: amounts.base_salary,
            total_allowance: amounts.total_allowance,
            total_deduction: amounts.total_deduction,
            net_salary,
        })
    }

    async fn list_payroll_lines(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<PayrollLine>, AppError> {
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT
                p.employee_id,
                e.full_name,
                p.month,
                COALESCE(p.base_salary, 0) AS base_salary,
                COALESCE(p.total_allowance, 0) AS total_allowance,
                COALESCE(p.total_deduction, 0) AS total_deduction,
                COALESCE(p.net_salary, 0) AS net_salary
            FROM payrolls p
            JOIN employees e ON p.employee_id = e.id
            "#,
        );

        if let Some(employee_id) = employee_id {
            qb.push(" WHERE p.employee_id = ").push_bind(employee_id);
        }
        qb.push(" ORDER BY p.month DESC, p.employee_id");

        let rows = qb
            .build_query_as::<PayrollLineRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PayrollLine::from).collect())
    }

    async fn find_payslip(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<PayslipDetail>, AppError> {
        let row = sqlx::query_as::<_, PayslipRow>(
            r#"
            SELECT
                p.id AS payroll_id,
                p.employee_id,
                e.full_name,
                d.name AS department_name,
                pos.name AS position_name,
                p.month,
                COALESCE(p.base_salary, 0) AS base_salary,
                COALESCE(p.total_allowance, 0) AS total_allowance,
                COALESCE(p.total_deduction, 0) AS total_deduction,
                COALESCE(p.net_salary, 0) AS net_salary
            FROM payrolls p
            JOIN employees e ON p.employee_id = e.id
            LEFT JOIN departments d ON e.department_id = d.id
            LEFT JOIN positions pos ON e.position_id = pos.id
            WHERE p.employee_id = ? AND p.month = ?
            "#,
        )
        .bind(employee_id)
        .bind(period.first_day())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PayslipDetail::from))
    }

    async fn find_payroll(&self, payroll_id: u64) -> Result<Option<Payroll>, AppError> {
        let row = sqlx::query_as::<_, PayrollRow>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE id = ?"
        ))
        .bind(payroll_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Payroll::from))
    }

    async fn patch_payroll(
        &self,
        payroll_id: u64,
        patch: &PayrollPatch,
    ) -> Result<Option<Payroll>, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, PayrollRow>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE id = ? FOR UPDATE"
        ))
        .bind(payroll_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Payroll::from);

        let Some(current) = current else {
            return Ok(None);
        };

        let amounts = patch.apply(&current.amounts());
        let net_salary = amounts.net_salary();

        sqlx::query(
            r#"
            UPDATE payrolls
            SET base_salary = ?, total_allowance = ?, total_deduction = ?, net_salary = ?
            WHERE id = ?
            "#,
        )
        .bind(amounts.base_salary)
        .bind(amounts.total_allowance)
        .bind(amounts.total_deduction)
        .bind(net_salary)
        .bind(payroll_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(Payroll {
            base_salary: amounts.base_salary,
            total_allowance: amounts.total_allowance,
            total_deduction: amounts.total_deduction,
            net_salary,
            ..current
        }))
    }

    async fn delete_payroll(&self, payroll_id: u64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM payrolls WHERE id = ?")
            .bind(payroll_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
