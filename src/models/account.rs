//! Account model: a user's identity at an external OAuth provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link between a local user and a provider identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    /// Provider name, e.g. `google`
    pub provider: String,
    /// The provider's stable subject identifier
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: i64, provider: impl Into<String>, provider_account_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            created_at: Utc::now(),
        }
    }
}
