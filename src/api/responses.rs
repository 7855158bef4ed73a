//! Shared API response types
//!
//! Bodies returned by more than one endpoint. Models that serialize as-is
//! (`User`, `Post`, `PostWithAuthor`) are returned directly.

use serde::{Deserialize, Serialize};

use crate::models::User;

/// Response for a successful credential login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Response for the session endpoint; `user` is `null` when signed out
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}
