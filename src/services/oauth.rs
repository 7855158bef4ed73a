//! OAuth sign-in providers
//!
//! A provider knows how to send the browser to its consent screen and how to
//! turn the returned authorization code into a profile. Account linking and
//! session creation happen in [`UserService`](super::UserService).

use crate::config::{Config, OAuthClientConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// Identity returned by a provider after a successful code exchange
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    /// The provider's stable subject identifier
    pub provider_account_id: String,
    pub email: String,
    /// Whether the provider vouches for `email`
    pub email_verified: bool,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Error types for OAuth operations
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// No provider with this name is configured
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The `state` parameter did not match the one issued
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The provider rejected the exchange or returned an unusable profile
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// An OAuth 2.0 authorization-code provider
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short name used in routes and account rows, e.g. `google`
    fn name(&self) -> &str;

    /// URL of the provider's consent screen carrying `state`
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthError>;
}

/// Generate a random value for the `state` parameter
pub fn new_state() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Google sign-in (OpenID Connect)
pub struct GoogleProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleProvider {
    pub fn new(config: &OAuthClientConfig, public_url: &str) -> Result<Self, OAuthError> {
        let client = Client::builder()
            .user_agent("postboard")
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| OAuthError::InternalError(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: callback_url(public_url, "google"),
        })
    }
}

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            GOOGLE_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(GOOGLE_SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthError> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::ProviderError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::ProviderError(format!(
                "Token endpoint returned {}",
                response.status()
            )));
        }

        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::ProviderError(format!("Invalid token response: {}", e)))?;

        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProviderError(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(OAuthError::ProviderError(format!(
                "Userinfo endpoint returned {}",
                response.status()
            )));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::ProviderError(format!("Invalid userinfo response: {}", e)))?;

        let email = info
            .email
            .ok_or_else(|| OAuthError::ProviderError("Profile has no email".to_string()))?;

        Ok(OAuthProfile {
            provider_account_id: info.sub,
            email,
            email_verified: info.email_verified,
            name: info.name,
            image: info.picture,
        })
    }
}

/// Callback URL registered with a provider
pub fn callback_url(public_url: &str, provider: &str) -> String {
    format!(
        "{}/api/auth/callback/{}",
        public_url.trim_end_matches('/'),
        provider
    )
}

/// The configured providers, looked up by name
#[derive(Clone, Default)]
pub struct OAuthProviders {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl OAuthProviders {
    /// Build the registry from configuration; unconfigured providers are absent.
    pub fn from_config(config: &Config) -> Result<Self, OAuthError> {
        let mut providers = Self::default();
        if let Some(google) = &config.oauth.google {
            providers = providers.with_provider(Arc::new(GoogleProvider::new(
                google,
                &config.server.public_url,
            )?));
            tracing::info!("OAuth provider enabled: google");
        }
        Ok(providers)
    }

    pub fn with_provider(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn OAuthProvider>, OAuthError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| OAuthError::UnknownProvider(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_config() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "client-123.apps".to_string(),
            client_secret: "shh".to_string(),
        }
    }

    #[test]
    fn test_callback_url_trims_trailing_slash() {
        assert_eq!(
            callback_url("https://board.example/", "google"),
            "https://board.example/api/auth/callback/google"
        );
    }

    #[test]
    fn test_google_authorize_url() {
        let provider = GoogleProvider::new(&google_config(), "http://localhost:8080").unwrap();
        let url = provider.authorize_url("abc123");

        assert!(url.starts_with(GOOGLE_AUTHORIZE_URL));
        assert!(url.contains("client_id=client-123.apps"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fapi%2Fauth%2Fcallback%2Fgoogle"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
    }

    #[test]
    fn test_registry_without_configuration_is_empty() {
        let providers = OAuthProviders::from_config(&Config::default()).unwrap();

        assert!(providers.is_empty());
        assert!(matches!(
            providers.get("google"),
            Err(OAuthError::UnknownProvider(name)) if name == "google"
        ));
    }

    #[test]
    fn test_registry_with_google() {
        let mut config = Config::default();
        config.oauth.google = Some(google_config());

        let providers = OAuthProviders::from_config(&config).unwrap();
        assert_eq!(providers.get("google").unwrap().name(), "google");
        assert!(providers.get("github").is_err());
    }

    #[test]
    fn test_new_state_is_random() {
        let a = new_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, new_state());
    }
}
