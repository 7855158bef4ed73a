//! Profile API endpoint
//!
//! - PATCH /api/profile - Edit the signed-in user's name and avatar

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::common::double_option;
use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::models::{UpdateProfileInput, User};

/// Request body for a profile edit
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// `null` removes the avatar
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

/// PATCH /api/profile
///
/// The target is always the session's user; the body cannot name another.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .user_service
        .update_profile(
            user.id,
            UpdateProfileInput {
                name: body.name,
                image: body.image,
            },
        )
        .await?;

    Ok(Json(updated))
}
