use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payroll::money;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Allowance {
    pub id: u64,
    pub employee_id: u64,
    pub month: NaiveDate,
    pub allowance: Option<Decimal>,
    pub bonus: Option<Decimal>,
}

impl Allowance {
    pub fn total(&self) -> Decimal {
        money(self.allowance.unwrap_or_default() + self.bonus.unwrap_or_default())
    }
}
