use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payroll::money;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deduction {
    pub id: u64,
    pub employee_id: u64,
    pub month: NaiveDate,
    pub insurance: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub other: Option<Decimal>,
}

impl Deduction {
    pub fn total(&self) -> Decimal {
        money(
            self.insurance.unwrap_or_default()
                + self.tax.unwrap_or_default()
                + self.other.unwrap_or_default(),
        )
    }
}
