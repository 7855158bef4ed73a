//! User model
//!
//! A user signs in either with email + password (`hashed_password` is set) or
//! through an OAuth provider (linked via [`Account`](super::Account) rows, no
//! password). Both kinds can author posts and edit their profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Display name
    pub name: Option<String>,
    /// Email address (unique)
    pub email: String,
    /// Set when the address was confirmed by an OAuth provider
    pub email_verified: Option<DateTime<Utc>>,
    /// Avatar URL
    pub image: Option<String>,
    /// Argon2 PHC string; `None` for OAuth-only users
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a not-yet-persisted user; the database assigns the id.
    pub fn new(email: String, name: Option<String>, hashed_password: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            email,
            email_verified: None,
            image: None,
            hashed_password,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this user can sign in with a password
    pub fn has_password(&self) -> bool {
        self.hashed_password.is_some()
    }

    /// Whether this user owns content authored by `user_id`
    pub fn owns(&self, user_id: i64) -> bool {
        self.id == user_id
    }
}

/// Profile fields a user may change about themselves.
///
/// `None` leaves a field untouched; `Some(None)` on `image` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub image: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "pan@example.com".to_string(),
            Some("Pan".to_string()),
            Some("$argon2id$hash".to_string()),
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.email, "pan@example.com");
        assert_eq!(user.name.as_deref(), Some("Pan"));
        assert!(user.has_password());
        assert!(user.image.is_none());
        assert!(user.email_verified.is_none());
    }

    #[test]
    fn test_oauth_user_has_no_password() {
        let user = User::new("oauth@example.com".to_string(), None, None);
        assert!(!user.has_password());
    }

    #[test]
    fn test_owns() {
        let mut user = User::new("a@example.com".to_string(), None, None);
        user.id = 7;

        assert!(user.owns(7));
        assert!(!user.owns(8));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new(
            "secret@example.com".to_string(),
            None,
            Some("$argon2id$v=19$secret".to_string()),
        );

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("argon2id"));
    }
}
