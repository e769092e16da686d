use serde::Serialize;

use super::role::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: u8,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub is_active: bool,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }
}
