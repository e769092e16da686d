use sqlx::MySqlPool;

mod credentials;
mod employee;
mod payroll;

/// Store backed by the MySQL pool. Implements every store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}
