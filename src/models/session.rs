//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side session backing a login cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (the token handed to the client)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for `user_id` with a random token.
    pub fn start(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_session() {
        let session = Session::start(3, Duration::days(1));

        assert_eq!(session.user_id, 3);
        assert_eq!(session.id.len(), 64);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = Session::start(1, Duration::days(1));
        let b = Session::start(1, Duration::days(1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_expired_session() {
        let session = Session::start(1, Duration::seconds(-1));
        assert!(session.is_expired());
    }
}
