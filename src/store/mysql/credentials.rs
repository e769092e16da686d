use async_trait::async_trait;

use super::MySqlStore;
use crate::{
    error::{AppError, constraint_error},
    model::{role::Role, user::User},
    store::CredentialStore,
};

const USER_COLUMNS: &str = "id, username, password_hash, role_id, employee_id, is_active";

#[async_trait]
impl CredentialStore for MySqlStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: u64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        employee_id: Option<u64>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"INSERT INTO users (username, password_hash, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.id())
        .bind(employee_id)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Username already exists"))?;

        Ok(result.last_insert_id())
    }

    async fn set_password(&self, user_id: u64, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn touch_last_login(&self, user_id: u64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: usize,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let record: Option<(u64, bool)> = sqlx::query_as(
            "SELECT user_id, revoked FROM refresh_tokens WHERE jti = ? FOR UPDATE",
        )
        .bind(jti)
        .fetch_optional(&mut *tx)
        .await?;

        let user_id = match record {
            Some((user_id, false)) => user_id,
            _ => return Ok(None),
        };

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user_id))
    }
}
