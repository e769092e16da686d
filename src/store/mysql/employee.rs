use async_trait::async_trait;
use sqlx::{MySql, QueryBuilder};

use super::MySqlStore;
use crate::{
    error::{AppError, constraint_error},
    model::employee::{CreateEmployee, Employee, EmployeeQuery, UpdateEmployee},
    store::EmployeeStore,
    utils::db_utils::SqlUpdate,
};

const EMPLOYEE_COLUMNS: &str =
    "id, full_name, email, phone, department_id, position_id, hire_date, status";

fn push_filters(qb: &mut QueryBuilder<'_, MySql>, query: &EmployeeQuery) {
    let mut sep = " WHERE ";

    if let Some(department_id) = query.department_id {
        qb.push(sep).push("department_id = ").push_bind(department_id);
        sep = " AND ";
    }

    if let Some(position_id) = query.position_id {
        qb.push(sep).push("position_id = ").push_bind(position_id);
        sep = " AND ";
    }

    if let Some(status) = &query.status {
        qb.push(sep).push("status = ").push_bind(status.clone());
        sep = " AND ";
    }

    if let Some(search) = &query.search {
        let like = format!("%{}%", search.trim());
        qb.push(sep)
            .push("(full_name LIKE ")
            .push_bind(like.clone())
            .push(" OR email LIKE ")
            .push_bind(like)
            .push(")");
    }
}

fn email_conflict(e: sqlx::Error) -> AppError {
    constraint_error(e, "Email already exists")
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_employees(&self, query: &EmployeeQuery) -> Result<(Vec<Employee>, i64), AppError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM employees");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut data = QueryBuilder::<MySql>::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees"));
        push_filters(&mut data, query);
        data.push(" ORDER BY id DESC LIMIT ")
            .push_bind(query.per_page() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let employees = data
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await?;

        Ok((employees, total))
    }

    async fn get_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn create_employee(&self, new: &CreateEmployee) -> Result<Employee, AppError> {
        let status = new.status.as_deref().unwrap_or("active");

        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (full_name, email, phone, department_id, position_id, hire_date, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.full_name.trim())
        .bind(new.email.trim())
        .bind(&new.phone)
        .bind(new.department_id)
        .bind(new.position_id)
        .bind(new.hire_date)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(email_conflict)?;

        Ok(Employee {
            id: result.last_insert_id(),
            full_name: new.full_name.trim().to_string(),
            email: new.email.trim().to_string(),
            phone: new.phone.clone(),
            department_id: new.department_id,
            position_id: new.position_id,
            hire_date: new.hire_date,
            status: status.to_string(),
        })
    }

    async fn update_employee(
        &self,
        employee_id: u64,
        patch: &UpdateEmployee,
    ) -> Result<Option<Employee>, AppError> {
        let update = SqlUpdate::new("employees", "id")
            .set("full_name", patch.full_name.as_ref().map(|s| s.trim().to_string()))
            .set("email", patch.email.as_ref().map(|s| s.trim().to_string()))
            .set("phone", patch.phone.clone())
            .set("department_id", patch.department_id)
            .set("position_id", patch.position_id)
            .set("status", patch.status.clone())
            .set("hire_date", patch.hire_date);

        if !update.is_empty() {
            update
                .into_query(employee_id)
                .build()
                .execute(&self.pool)
                .await
                .map_err(email_conflict)?;
        }

        // MySQL reports changed rows, not matched ones, so re-read.
        self.get_employee(employee_id).await
    }

    async fn delete_employee(&self, employee_id: u64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
