//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - Implementing business rules (validation, ownership)
//! - Coordinating between repositories
//! - Translating store failures into service errors

pub mod oauth;
pub mod password;
pub mod post;
pub mod user;

pub use oauth::{GoogleProvider, OAuthError, OAuthProfile, OAuthProvider, OAuthProviders};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{LoginInput, SignupInput, UserService, UserServiceError};

/// Normalize an image URL: blank strings mean "no image".
pub(crate) fn normalize_image(image: Option<String>) -> Option<String> {
    image
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}
