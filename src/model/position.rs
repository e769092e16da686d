use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Position {
    pub id: u64,
    pub name: String,
    /// Pre-adjustment monthly pay for the role.
    pub base_salary: Decimal,
}
