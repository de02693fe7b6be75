//! Staff accounts for the UI login screen.

use super::Storage;
use crate::error::GymError;
use crate::password;
use anyhow::Result;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaffAccountRow {
    pub id: String,
    pub username: String,
    /// `v1$<iterations>$<salt>$<digest>` — never serialized to the UI.
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Storage {
    pub async fn create_account(
        &self,
        username: &str,
        password_plain: &str,
        role: &str,
    ) -> Result<StaffAccountRow> {
        if username.trim().is_empty() {
            return Err(GymError::InvalidParams("username must not be empty".into()).into());
        }
        if password_plain.is_empty() {
            return Err(GymError::InvalidParams("password must not be empty".into()).into());
        }
        if role != ROLE_ADMIN && role != ROLE_STAFF {
            return Err(GymError::InvalidParams(format!(
                "unknown role '{role}' (expected 'admin' or 'staff')"
            ))
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let hash = password::hash_password(password_plain)?;
        let insert = sqlx::query(
            "INSERT INTO staff_accounts (id, username, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(&hash)
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(self.pool_ref())
        .await;

        if let Err(e) = insert {
            if e.to_string().contains("UNIQUE constraint failed") {
                return Err(
                    GymError::Refused(format!("username '{username}' is already taken")).into(),
                );
            }
            return Err(e.into());
        }
        self.require_account(&id).await
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<StaffAccountRow>> {
        Ok(sqlx::query_as("SELECT * FROM staff_accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_ref())
            .await?)
    }

    pub async fn require_account(&self, id: &str) -> Result<StaffAccountRow> {
        self.get_account(id)
            .await?
            .ok_or_else(|| GymError::AccountNotFound(id.to_string()).into())
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<StaffAccountRow>> {
        Ok(sqlx::query_as("SELECT * FROM staff_accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool_ref())
            .await?)
    }

    pub async fn list_accounts(&self) -> Result<Vec<StaffAccountRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM staff_accounts ORDER BY username COLLATE NOCASE ASC")
                .fetch_all(self.pool_ref())
                .await?,
        )
    }

    /// Verify a username/password pair. The same `LoginFailed` error covers
    /// unknown usernames and wrong passwords — no account enumeration.
    pub async fn verify_login(&self, username: &str, password_plain: &str) -> Result<StaffAccountRow> {
        let account = self
            .get_account_by_username(username)
            .await?
            .ok_or(GymError::LoginFailed)?;
        if !password::verify_password(password_plain, &account.password_hash) {
            return Err(GymError::LoginFailed.into());
        }
        Ok(account)
    }

    /// Change a password after verifying the old one.
    pub async fn change_password(
        &self,
        id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.is_empty() {
            return Err(GymError::InvalidParams("password must not be empty".into()).into());
        }
        let account = self.require_account(id).await?;
        if !password::verify_password(old_password, &account.password_hash) {
            return Err(GymError::LoginFailed.into());
        }
        let hash = password::hash_password(new_password)?;
        sqlx::query("UPDATE staff_accounts SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&hash)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        Ok(())
    }

    /// Delete an account. The last remaining admin cannot be deleted —
    /// that would lock everyone out of the UI.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        let account = self.require_account(id).await?;
        if account.role == ROLE_ADMIN {
            let (admins,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM staff_accounts WHERE role = 'admin'")
                    .fetch_one(self.pool_ref())
                    .await?;
            if admins <= 1 {
                return Err(
                    GymError::Refused("cannot delete the last admin account".into()).into(),
                );
            }
        }
        sqlx::query("DELETE FROM staff_accounts WHERE id = ?")
            .bind(id)
            .execute(self.pool_ref())
            .await?;
        Ok(())
    }

    /// First-run bootstrap: create `admin`/`admin` when no accounts exist.
    pub async fn ensure_default_admin(&self) -> Result<()> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM staff_accounts")
            .fetch_one(self.pool_ref())
            .await?;
        if count > 0 {
            return Ok(());
        }
        self.create_account("admin", "admin", ROLE_ADMIN).await?;
        warn!("created default admin account 'admin'/'admin' — change this password now");
        Ok(())
    }
}
