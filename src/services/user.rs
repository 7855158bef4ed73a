//! User service
//!
//! Implements business logic for users and their sessions:
//! - Sign-up with email and password
//! - Credential login / logout
//! - OAuth sign-in with account linking
//! - Session resolution (`current_user`)
//! - Profile edits

use crate::db::repositories::{
    is_unique_violation, AccountRepository, SessionRepository, UserRepository,
};
use crate::models::{Account, Session, UpdateProfileInput, User};
use crate::services::oauth::OAuthProfile;
use crate::services::normalize_image;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

const MIN_NAME_LENGTH: usize = 2;
const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for sign-up
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupInput {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for credential login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), UserServiceError> {
    if name.trim().chars().count() < MIN_NAME_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Name must be at least {} characters",
            MIN_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if !EMAIL_RE.is_match(email) {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }
    Ok(())
}

/// Validate a new password
pub fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    account_repo: Arc<dyn AccountRepository>,
    session_ttl: Duration,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        account_repo: Arc<dyn AccountRepository>,
    ) -> Self {
        Self::with_session_ttl(
            user_repo,
            session_repo,
            account_repo,
            Duration::days(DEFAULT_SESSION_TTL_DAYS),
        )
    }

    /// Create a new user service with a custom session lifetime
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        account_repo: Arc<dyn AccountRepository>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            account_repo,
            session_ttl,
        }
    }

    /// Register a user with email and password.
    ///
    /// No session is created; the client logs in afterwards.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if name, email or password break the form rules
    /// - `UserExists` if the email is already registered
    pub async fn signup(&self, input: SignupInput) -> Result<User, UserServiceError> {
        validate_name(&input.name)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(
            input.email,
            Some(input.name.trim().to_string()),
            Some(password_hash),
        );

        // A concurrent sign-up can claim the email after the check above
        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                return Err(UserServiceError::UserExists(format!(
                    "Email '{}' is already registered",
                    user.email
                )));
            }
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = created.id, "User signed up");
        Ok(created)
    }

    /// Log in with email and password, returning the user and a fresh session.
    ///
    /// Unknown email, a user without a password and a wrong password all
    /// produce the same `AuthenticationError`.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let hash = user.hashed_password.as_deref().ok_or_else(invalid)?;
        let password_valid =
            verify_password(&input.password, hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Invalidate a session. Unknown tokens are not an error.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve the user behind a session token.
    ///
    /// Returns `None` for unknown or expired tokens, a missing user row, and
    /// store failures alike; failures are logged.
    pub async fn current_user(&self, token: &str) -> Option<User> {
        match self.resolve_session(token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Session lookup failed: {:#}", e);
                None
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Update the profile of `user_id`.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        if let Some(name) = &input.name {
            validate_name(name)?;
        }

        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound)?;

        if let Some(name) = input.name {
            user.name = Some(name.trim().to_string());
        }
        if let Some(image) = input.image {
            user.image = normalize_image(image);
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;
        Ok(updated)
    }

    /// Sign in with a provider profile, linking or creating the user as needed.
    ///
    /// 1. a known provider identity signs in its linked user;
    /// 2. otherwise a user with the same email gets the identity linked, but
    ///    only when the provider has verified that email;
    /// 3. otherwise a new password-less user is created and linked.
    pub async fn sign_in_with_oauth(
        &self,
        provider: &str,
        profile: OAuthProfile,
    ) -> Result<(User, Session), UserServiceError> {
        let linked = self
            .account_repo
            .get_by_provider(provider, &profile.provider_account_id)
            .await
            .context("Failed to look up account")?;

        let user = match linked {
            Some(account) => self
                .user_repo
                .get_by_id(account.user_id)
                .await
                .context("Failed to get linked user")?
                .ok_or(UserServiceError::NotFound)?,
            None => {
                let user = match self
                    .user_repo
                    .get_by_email(&profile.email)
                    .await
                    .context("Failed to get user by email")?
                {
                    Some(existing) if profile.email_verified => existing,
                    Some(existing) => {
                        tracing::warn!(
                            user_id = existing.id,
                            provider,
                            "Refused to link OAuth account with unverified email"
                        );
                        return Err(UserServiceError::ValidationError(
                            "This email is already registered and the provider has not verified it"
                                .to_string(),
                        ));
                    }
                    None => {
                        let mut user = User::new(profile.email.clone(), profile.name.clone(), None);
                        user.image = normalize_image(profile.image.clone());
                        if profile.email_verified {
                            user.email_verified = Some(Utc::now());
                        }
                        self.user_repo
                            .create(&user)
                            .await
                            .context("Failed to create user")?
                    }
                };

                self.account_repo
                    .create(&Account::new(user.id, provider, &profile.provider_account_id))
                    .await
                    .context("Failed to link account")?;
                tracing::info!(user_id = user.id, provider, "Linked OAuth account");
                user
            }
        };

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn resolve_session(&self, token: &str) -> anyhow::Result<Option<User>> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        self.user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_ttl);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAccountRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use async_trait::async_trait;

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxAccountRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    async fn signed_up(service: &UserService, email: &str) -> User {
        service
            .signup(SignupInput::new("Tester", email, "secret1"))
            .await
            .expect("Failed to sign up")
    }

    fn google_profile(sub: &str, email: &str) -> OAuthProfile {
        OAuthProfile {
            provider_account_id: sub.to_string(),
            email: email.to_string(),
            email_verified: true,
            name: Some("Googler".to_string()),
            image: Some("https://lh3.example/p.png".to_string()),
        }
    }

    // ========================================================================
    // Sign-up
    // ========================================================================

    #[tokio::test]
    async fn test_signup_creates_user_with_hashed_password() {
        let (_pool, service) = setup_test_service().await;

        let user = signed_up(&service, "new@example.com").await;

        assert!(user.id > 0);
        assert_eq!(user.name.as_deref(), Some("Tester"));
        let hash = user.hashed_password.as_deref().unwrap();
        assert_ne!(hash, "secret1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_fails() {
        let (_pool, service) = setup_test_service().await;
        signed_up(&service, "dup@example.com").await;

        let result = service
            .signup(SignupInput::new("Other", "dup@example.com", "secret2"))
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    /// Sees no users by email, like a sign-up racing another one
    struct StaleEmailLookup(Arc<dyn UserRepository>);

    #[async_trait]
    impl UserRepository for StaleEmailLookup {
        async fn create(&self, user: &User) -> anyhow::Result<User> {
            self.0.create(user).await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }

        async fn get_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn update(&self, user: &User) -> anyhow::Result<User> {
            self.0.update(user).await
        }
    }

    #[tokio::test]
    async fn test_signup_losing_race_reports_existing_email() {
        let (pool, service) = setup_test_service().await;
        signed_up(&service, "race@example.com").await;

        let racing = UserService::new(
            Arc::new(StaleEmailLookup(SqlxUserRepository::boxed(pool.clone()))),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxAccountRepository::boxed(pool.clone()),
        );
        let result = racing
            .signup(SignupInput::new("Second", "race@example.com", "secret2"))
            .await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (_pool, service) = setup_test_service().await;

        for input in [
            SignupInput::new("A", "a@example.com", "secret1"),
            SignupInput::new("Alice", "not-an-email", "secret1"),
            SignupInput::new("Alice", "a@example.com", "12345"),
        ] {
            let result = service.signup(input).await;
            assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
        }
    }

    // ========================================================================
    // Login / logout / session resolution
    // ========================================================================

    #[tokio::test]
    async fn test_login_and_resolve_session() {
        let (_pool, service) = setup_test_service().await;
        let user = signed_up(&service, "login@example.com").await;

        let (logged_in, session) = service
            .login(LoginInput::new("login@example.com", "secret1"))
            .await
            .expect("Login should succeed");
        assert_eq!(logged_in.id, user.id);

        let current = service.current_user(&session.id).await.expect("Session should resolve");
        assert_eq!(current.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let (_pool, service) = setup_test_service().await;
        signed_up(&service, "login@example.com").await;
        service
            .sign_in_with_oauth("google", google_profile("sub-1", "oauth@example.com"))
            .await
            .unwrap();

        for input in [
            LoginInput::new("login@example.com", "wrong-password"),
            LoginInput::new("nobody@example.com", "secret1"),
            LoginInput::new("oauth@example.com", "secret1"),
        ] {
            let result = service.login(input).await;
            match result {
                Err(UserServiceError::AuthenticationError(msg)) => {
                    assert_eq!(msg, "Invalid email or password")
                }
                other => panic!("expected authentication error, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (_pool, service) = setup_test_service().await;
        signed_up(&service, "out@example.com").await;
        let (_, session) = service
            .login(LoginInput::new("out@example.com", "secret1"))
            .await
            .unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service.current_user(&session.id).await.is_none());

        // Logging out twice is fine
        service.logout(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_current_user_unknown_token() {
        let (_pool, service) = setup_test_service().await;
        assert!(service.current_user("does-not-exist").await.is_none());
        assert!(service.current_user("").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_resolves_to_none_and_is_deleted() {
        let (pool, _) = setup_test_service().await;
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            session_repo.clone(),
            SqlxAccountRepository::boxed(pool.clone()),
            Duration::seconds(-1),
        );
        signed_up(&service, "old@example.com").await;
        let (_, session) = service
            .login(LoginInput::new("old@example.com", "secret1"))
            .await
            .unwrap();

        assert!(service.current_user(&session.id).await.is_none());
        assert!(session_repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_current_user_swallows_store_errors() {
        let (pool, service) = setup_test_service().await;
        pool.close().await;

        assert!(service.current_user("any-token").await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (pool, service) = setup_test_service().await;
        let user = signed_up(&service, "c@example.com").await;
        let session_repo = SqlxSessionRepository::new(pool.clone());
        session_repo
            .create(&Session::start(user.id, Duration::seconds(-5)))
            .await
            .unwrap();
        service
            .login(LoginInput::new("c@example.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
    }

    // ========================================================================
    // Profile
    // ========================================================================

    #[tokio::test]
    async fn test_update_profile_only_touches_target_user() {
        let (_pool, service) = setup_test_service().await;
        let me = signed_up(&service, "me@example.com").await;
        let other = signed_up(&service, "other@example.com").await;

        let updated = service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: Some("New Name".to_string()),
                    image: Some(Some("/uploads/me.png".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("New Name"));
        assert_eq!(updated.image.as_deref(), Some("/uploads/me.png"));

        let untouched = service.get_by_id(other.id).await.unwrap().unwrap();
        assert_eq!(untouched.name.as_deref(), Some("Tester"));
        assert!(untouched.image.is_none());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_short_name() {
        let (_pool, service) = setup_test_service().await;
        let me = signed_up(&service, "me@example.com").await;

        let result = service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: Some("x".to_string()),
                    image: None,
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_profile_clears_image() {
        let (_pool, service) = setup_test_service().await;
        let me = signed_up(&service, "me@example.com").await;
        service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: None,
                    image: Some(Some("/uploads/a.png".to_string())),
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: None,
                    image: Some(None),
                },
            )
            .await
            .unwrap();
        assert!(updated.image.is_none());
        assert_eq!(updated.name.as_deref(), Some("Tester"));
    }

    #[tokio::test]
    async fn test_update_profile_blank_image_is_cleared() {
        let (_pool, service) = setup_test_service().await;
        let me = signed_up(&service, "me@example.com").await;

        let updated = service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: None,
                    image: Some(Some("   ".to_string())),
                },
            )
            .await
            .unwrap();
        assert!(updated.image.is_none());

        let updated = service
            .update_profile(
                me.id,
                UpdateProfileInput {
                    name: None,
                    image: Some(Some(" /uploads/b.png ".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.image.as_deref(), Some("/uploads/b.png"));
    }

    // ========================================================================
    // OAuth
    // ========================================================================

    #[tokio::test]
    async fn test_oauth_creates_verified_user() {
        let (_pool, service) = setup_test_service().await;

        let (user, session) = service
            .sign_in_with_oauth("google", google_profile("sub-1", "g@example.com"))
            .await
            .unwrap();

        assert_eq!(user.email, "g@example.com");
        assert_eq!(user.name.as_deref(), Some("Googler"));
        assert!(user.email_verified.is_some());
        assert!(!user.has_password());
        assert_eq!(service.current_user(&session.id).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_oauth_is_idempotent_per_identity() {
        let (_pool, service) = setup_test_service().await;

        let (first, _) = service
            .sign_in_with_oauth("google", google_profile("sub-1", "g@example.com"))
            .await
            .unwrap();
        let (second, _) = service
            .sign_in_with_oauth("google", google_profile("sub-1", "changed@example.com"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_oauth_unverified_email_does_not_link_existing_user() {
        let (pool, service) = setup_test_service().await;
        let existing = signed_up(&service, "victim@example.com").await;

        let mut profile = google_profile("sub-evil", "victim@example.com");
        profile.email_verified = false;
        let result = service.sign_in_with_oauth("google", profile).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));

        let accounts = SqlxAccountRepository::new(pool.clone());
        assert!(accounts
            .get_by_provider("google", "sub-evil")
            .await
            .unwrap()
            .is_none());
        let unchanged = service.get_by_id(existing.id).await.unwrap().unwrap();
        assert!(unchanged.email_verified.is_none());
    }

    #[tokio::test]
    async fn test_oauth_unverified_email_creates_unverified_user() {
        let (_pool, service) = setup_test_service().await;

        let mut profile = google_profile("sub-2", "fresh@example.com");
        profile.email_verified = false;
        let (user, _) = service.sign_in_with_oauth("google", profile).await.unwrap();

        assert_eq!(user.email, "fresh@example.com");
        assert!(user.email_verified.is_none());
    }

    #[tokio::test]
    async fn test_oauth_links_existing_user_by_email() {
        let (_pool, service) = setup_test_service().await;
        let existing = signed_up(&service, "both@example.com").await;

        let (user, _) = service
            .sign_in_with_oauth("google", google_profile("sub-9", "both@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, existing.id);
        // Password login still works for the linked user
        assert!(service
            .login(LoginInput::new("both@example.com", "secret1"))
            .await
            .is_ok());
    }
}
