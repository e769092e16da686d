//! In-memory store and app harness for the test suite.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

use actix_web::{
    App,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test::TestRequest,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token},
        password::hash_password,
    },
    config::Config,
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
    routes::{self, Limiters},
    store::{CredentialStore, EmployeeStore, PayrollStore},
};

#[derive(Default)]
struct State {
    next_id: u64,
    departments: HashMap<u64, String>,
    positions: Vec<Position>,
    employees: Vec<Employee>,
    allowances: Vec<Allowance>,
    deductions: Vec<Deduction>,
    payrolls: Vec<Payroll>,
    users: Vec<User>,
    // jti -> (user_id, revoked)
    refresh_tokens: HashMap<String, (u64, bool)>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.employees
            .iter()
            .any(|e| Some(e.id) != except && e.email.eq_ignore_ascii_case(email.trim()))
    }

    /// Foreign keys the MySQL schema enforces on employees.
    fn check_references(
        &self,
        department_id: Option<u64>,
        position_id: Option<u64>,
    ) -> Result<(), AppError> {
        let department_ok = department_id.is_none_or(|id| self.departments.contains_key(&id));
        let position_ok = position_id.is_none_or(|id| self.positions.iter().any(|p| p.id == id));
        if department_ok && position_ok {
            Ok(())
        } else {
            Err(AppError::unprocessable("Referenced record does not exist"))
        }
    }
}

/// Mirrors the MySQL store's observable behaviour. The state lock is held
/// for the whole of every operation, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    offline: AtomicBool,
}

fn storage_failure() -> AppError {
    AppError::Storage("Storage failure, no changes were saved".to_string())
}

fn month(s: &str) -> NaiveDate {
    s.parse::<Period>().unwrap().first_day()
}

fn seed_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("employee-pass").unwrap())
}

impl MemoryStore {
    /// Two departments, two positions, four employees (one without a
    /// position, one pointing at a missing position), March 2024 inputs
    /// for employee 1 and two user accounts.
    pub fn seeded() -> Self {
        let store = MemoryStore::default();
        {
            let mut s = store.state();
            s.departments = HashMap::from([
                (1, "Engineering".to_string()),
                (2, "Finance".to_string()),
            ]);
            s.positions = vec![
                Position {
                    id: 1,
                    name: "Backend Developer".into(),
                    base_salary: dec!(10000000),
                },
                Position {
                    id: 2,
                    name: "Accountant".into(),
                    base_salary: dec!(8000000),
                },
            ];

            let hire_date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
            let employee = |id, full_name: &str, email: &str, department_id, position_id| Employee {
                id,
                full_name: full_name.into(),
                email: email.into(),
                phone: None,
                department_id,
                position_id,
                hire_date,
                status: "active".into(),
            };
            s.employees = vec![
                employee(1, "Nguyen Van A", "a.nguyen@company.com", Some(1), Some(1)),
                employee(2, "Tran Thi B", "b.tran@company.com", Some(2), Some(2)),
                employee(3, "Le Thi D", "d.le@company.com", None, None),
                employee(4, "Hoang Van E", "e.hoang@company.com", Some(1), Some(99)),
            ];

            s.allowances = vec![Allowance {
                id: 1,
                employee_id: 1,
                month: month("2024-03"),
                allowance: Some(dec!(500000)),
                bonus: Some(dec!(200000)),
            }];
            s.deductions = vec![Deduction {
                id: 1,
                employee_id: 1,
                month: month("2024-03"),
                insurance: Some(dec!(300000)),
                tax: Some(dec!(400000)),
                other: Some(Decimal::ZERO),
            }];

            s.users = vec![
                User {
                    id: 1,
                    username: "admin".into(),
                    password_hash: seed_hash().to_string(),
                    role_id: Role::Admin.id(),
                    employee_id: None,
                    is_active: true,
                },
                User {
                    id: 2,
                    username: "e1.worker".into(),
                    password_hash: seed_hash().to_string(),
                    role_id: Role::Employee.id(),
                    employee_id: Some(1),
                    is_active: true,
                },
            ];
            s.next_id = 100;
        }
        store
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn check_writes(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(storage_failure())
        } else {
            Ok(())
        }
    }

    /// Makes every subsequent write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn payroll_rows(&self) -> usize {
        self.state().payrolls.len()
    }

    pub fn set_bonus(&self, employee_id: u64, period: Period, bonus: Decimal) {
        let mut guard = self.state();
        let s = &mut *guard;
        let month = period.first_day();
        if let Some(row) = s
            .allowances
            .iter_mut()
            .find(|a| a.employee_id == employee_id && a.month == month)
        {
            row.bonus = Some(bonus);
            return;
        }

        let id = s.next_id();
        s.allowances.push(Allowance {
            id,
            employee_id,
            month,
            allowance: None,
            bonus: Some(bonus),
        });
    }

    pub fn set_deduction(
        &self,
        employee_id: u64,
        period: Period,
        insurance: Decimal,
        tax: Decimal,
        other: Decimal,
    ) {
        let mut s = self.state();
        let month = period.first_day();
        s.deductions
            .retain(|d| !(d.employee_id == employee_id && d.month == month));
        let id = s.next_id();
        s.deductions.push(Deduction {
            id,
            employee_id,
            month,
            insurance: Some(insurance),
            tax: Some(tax),
            other: Some(other),
        });
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn find_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        Ok(self.state().employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn find_position(&self, position_id: u64) -> Result<Option<Position>, AppError> {
        Ok(self.state().positions.iter().find(|p| p.id == position_id).cloned())
    }

    async fn find_allowance(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Allowance>, AppError> {
        let month = period.first_day();
        Ok(self
            .state()
            .allowances
            .iter()
            .find(|a| a.employee_id == employee_id && a.month == month)
            .cloned())
    }

    async fn find_deduction(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<Deduction>, AppError> {
        let month = period.first_day();
        Ok(self
            .state()
            .deductions
            .iter()
            .find(|d| d.employee_id == employee_id && d.month == month)
            .cloned())
    }

    async fn upsert_payroll(
        &self,
        employee_id: u64,
        period: Period,
        amounts: &PayrollAmounts,
    ) -> Result<Payroll, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        if !s.employees.iter().any(|e| e.id == employee_id) {
            return Err(AppError::not_found(format!("Employee {employee_id} does not exist")));
        }

        let existing = s
            .payrolls
            .iter()
            .position(|p| p.employee_id == employee_id && p.month == period);
        let id = match existing {
            Some(idx) => s.payrolls[idx].id,
            None => s.next_id(),
        };

        let payroll = Payroll {
            id,
            employee_id,
            month: period,
            base_salary: amounts.base_salary,
            total_allowance: amounts.total_allowance,
            total_deduction: amounts.total_deduction,
            net_salary: amounts.net_salary(),
        };
        match existing {
            Some(idx) => s.payrolls[idx] = payroll.clone(),
            None => s.payrolls.push(payroll.clone()),
        }
        Ok(payroll)
    }

    async fn list_payroll_lines(
        &self,
        employee_id: Option<u64>,
    ) -> Result<Vec<PayrollLine>, AppError> {
        let s = self.state();
        let mut lines: Vec<PayrollLine> = s
            .payrolls
            .iter()
            .filter(|p| employee_id.is_none_or(|id| p.employee_id == id))
            .filter_map(|p| {
                let employee = s.employees.iter().find(|e| e.id == p.employee_id)?;
                Some(PayrollLine {
                    employee_id: p.employee_id,
                    full_name: employee.full_name.clone(),
                    month: p.month,
                    base_salary: p.base_salary,
                    total_allowance: p.total_allowance,
                    total_deduction: p.total_deduction,
                    net_salary: p.net_salary,
                })
            })
            .collect();

        lines.sort_by(|a, b| {
            b.month
                .cmp(&a.month)
                .then(a.employee_id.cmp(&b.employee_id))
        });
        Ok(lines)
    }

    async fn find_payslip(
        &self,
        employee_id: u64,
        period: Period,
    ) -> Result<Option<PayslipDetail>, AppError> {
        let s = self.state();

        let Some(payroll) = s
            .payrolls
            .iter()
            .find(|p| p.employee_id == employee_id && p.month == period)
        else {
            return Ok(None);
        };
        let Some(employee) = s.employees.iter().find(|e| e.id == employee_id) else {
            return Ok(None);
        };

        let department_name = employee
            .department_id
            .and_then(|id| s.departments.get(&id))
            .cloned();
        let position_name = employee
            .position_id
            .and_then(|id| s.positions.iter().find(|p| p.id == id))
            .map(|p| p.name.clone());

        Ok(Some(PayslipDetail {
            payroll_id: payroll.id,
            employee_id,
            full_name: employee.full_name.clone(),
            department_name,
            position_name,
            month: period,
            base_salary: payroll.base_salary,
            total_allowance: payroll.total_allowance,
            total_deduction: payroll.total_deduction,
            net_salary: payroll.net_salary,
        }))
    }

    async fn find_payroll(&self, payroll_id: u64) -> Result<Option<Payroll>, AppError> {
        Ok(self.state().payrolls.iter().find(|p| p.id == payroll_id).cloned())
    }

    async fn patch_payroll(
        &self,
        payroll_id: u64,
        patch: &PayrollPatch,
    ) -> Result<Option<Payroll>, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        let Some(row) = s.payrolls.iter_mut().find(|p| p.id == payroll_id) else {
            return Ok(None);
        };
        let amounts = patch.apply(&row.amounts());
        row.base_salary = amounts.base_salary;
        row.total_allowance = amounts.total_allowance;
        row.total_deduction = amounts.total_deduction;
        row.net_salary = amounts.net_salary();
        Ok(Some(row.clone()))
    }

    async fn delete_payroll(&self, payroll_id: u64) -> Result<bool, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        let before = s.payrolls.len();
        s.payrolls.retain(|p| p.id != payroll_id);
        Ok(s.payrolls.len() < before)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        Ok(())
    }

    async fn list_employees(&self, query: &EmployeeQuery) -> Result<(Vec<Employee>, i64), AppError> {
        let s = self.state();
        let search = query.search.as_ref().map(|q| q.trim().to_lowercase());

        let mut matches: Vec<&Employee> = s
            .employees
            .iter()
            .filter(|e| query.department_id.is_none_or(|id| e.department_id == Some(id)))
            .filter(|e| query.position_id.is_none_or(|id| e.position_id == Some(id)))
            .filter(|e| query.status.as_ref().is_none_or(|st| &e.status == st))
            .filter(|e| {
                search.as_ref().is_none_or(|q| {
                    e.full_name.to_lowercase().contains(q) || e.email.to_lowercase().contains(q)
                })
            })
            .collect();
        matches.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_employee(&self, employee_id: u64) -> Result<Option<Employee>, AppError> {
        Ok(self.state().employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn create_employee(&self, new: &CreateEmployee) -> Result<Employee, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        if s.email_taken(&new.email, None) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        s.check_references(new.department_id, new.position_id)?;

        let employee = Employee {
            id: s.next_id(),
            full_name: new.full_name.trim().to_string(),
            email: new.email.trim().to_string(),
            phone: new.phone.clone(),
            department_id: new.department_id,
            position_id: new.position_id,
            hire_date: new.hire_date,
            status: new.status.clone().unwrap_or_else(|| "active".to_string()),
        };
        s.employees.push(employee.clone());
        Ok(employee)
    }

    async fn update_employee(
        &self,
        employee_id: u64,
        patch: &UpdateEmployee,
    ) -> Result<Option<Employee>, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        if let Some(email) = &patch.email {
            if s.email_taken(email, Some(employee_id)) {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }
        s.check_references(patch.department_id, patch.position_id)?;

        let Some(e) = s.employees.iter_mut().find(|e| e.id == employee_id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.full_name {
            e.full_name = v.trim().to_string();
        }
        if let Some(v) = &patch.email {
            e.email = v.trim().to_string();
        }
        if let Some(v) = &patch.phone {
            e.phone = Some(v.clone());
        }
        if let Some(v) = patch.department_id {
            e.department_id = Some(v);
        }
        if let Some(v) = patch.position_id {
            e.position_id = Some(v);
        }
        if let Some(v) = &patch.status {
            e.status = v.clone();
        }
        if let Some(v) = patch.hire_date {
            e.hire_date = v;
        }
        Ok(Some(e.clone()))
    }

    async fn delete_employee(&self, employee_id: u64) -> Result<bool, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        let before = s.employees.len();
        s.employees.retain(|e| e.id != employee_id);
        Ok(s.employees.len() < before)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.state().users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, user_id: u64) -> Result<Option<User>, AppError> {
        Ok(self.state().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        employee_id: Option<u64>,
    ) -> Result<u64, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        if s.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if employee_id.is_some_and(|id| !s.employees.iter().any(|e| e.id == id)) {
            return Err(AppError::unprocessable("Referenced record does not exist"));
        }

        let id = s.next_id();
        s.users.push(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role_id: role.id(),
            employee_id,
            is_active: true,
        });
        Ok(id)
    }

    async fn set_password(&self, user_id: u64, password_hash: &str) -> Result<(), AppError> {
        let mut s = self.state();
        self.check_writes()?;

        if let Some(user) = s.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn touch_last_login(&self, _user_id: u64) -> Result<(), AppError> {
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        _expires_at: usize,
    ) -> Result<(), AppError> {
        let mut s = self.state();
        self.check_writes()?;

        s.refresh_tokens.insert(jti.to_string(), (user_id, false));
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, AppError> {
        let mut s = self.state();
        self.check_writes()?;

        match s.refresh_tokens.get_mut(jti) {
            Some((user_id, revoked)) if !*revoked => {
                *revoked = true;
                Ok(Some(*user_id))
            }
            _ => Ok(None),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "mysql://unused".into(),
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 600,
        rate_refresh_per_min: 600,
        rate_protected_per_min: 6000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
        log_level: tracing::Level::DEBUG,
        db_max_connections: 1,
        run_migrations: false,
    }
}

/// Signs an access token for a synthetic user with the given role.
pub fn bearer(config: &Config, role: Role, employee_id: Option<u64>) -> String {
    let subject = TokenSubject {
        user_id: 900 + role.id() as u64,
        username: role.to_string(),
        role: role.id(),
        employee_id,
    };
    let token =
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).unwrap();
    format!("Bearer {token}")
}

/// The production route table over a seeded `MemoryStore`.
pub struct TestApp {
    pub config: Config,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn seeded() -> Self {
        TestApp {
            config: test_config(),
            store: Arc::new(MemoryStore::seeded()),
        }
    }

    pub fn build(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let config = self.config.clone();
        let limiters = Limiters::from_config(&config).unwrap();
        let store = self.store.clone();

        App::new()
            .configure(|cfg| routes::app_data(cfg, &config, store))
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    }

    /// Rate limiters key on the peer address, so every request needs one.
    pub fn request(&self, req: TestRequest) -> TestRequest {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        req.peer_addr(peer)
    }
}
