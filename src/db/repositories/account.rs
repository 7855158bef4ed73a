//! Account repository
//!
//! Maps (provider, provider_account_id) pairs to local users.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Account;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Link a provider identity to a user
    async fn create(&self, account: &Account) -> Result<Account>;

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Account>>;
}

pub struct SqlxAccountRepository {
    pool: DynDatabasePool,
}

impl SqlxAccountRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AccountRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    async fn create(&self, account: &Account) -> Result<Account> {
        let sql = r#"
            INSERT INTO accounts (user_id, provider, provider_account_id, created_at)
            VALUES (?, ?, ?, ?)
        "#;
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(account.user_id)
                .bind(&account.provider)
                .bind(&account.provider_account_id)
                .bind(account.created_at)
                .execute(pool)
                .await
                .context("Failed to create account")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(account.user_id)
                .bind(&account.provider)
                .bind(&account.provider_account_id)
                .bind(account.created_at)
                .execute(pool)
                .await
                .context("Failed to create account")?
                .last_insert_id() as i64,
        };

        Ok(Account {
            id,
            ..account.clone()
        })
    }

    async fn get_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Account>> {
        let sql = r#"
            SELECT id, user_id, provider, provider_account_id, created_at
            FROM accounts
            WHERE provider = ? AND provider_account_id = ?
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(provider)
                    .bind(provider_account_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get account")?;
                Ok(row.map(|row| Account {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    provider: row.get("provider"),
                    provider_account_id: row.get("provider_account_id"),
                    created_at: row.get("created_at"),
                }))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(provider)
                    .bind(provider_account_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get account")?;
                Ok(row.map(|row| Account {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    provider: row.get("provider"),
                    provider_account_id: row.get("provider_account_id"),
                    created_at: row.get("created_at"),
                }))
            }
        }
    }
}
