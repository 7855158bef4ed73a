//! Post API endpoints
//!
//! - GET /api/post - All posts, newest first
//! - POST /api/post - Create a post (auth)
//! - GET /api/post/{id} - One post
//! - PATCH /api/post/{id} - Edit own post (auth)
//! - DELETE /api/post/{id} - Delete own post (auth)

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::api::common::double_option;
use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::models::{CreatePostInput, Post, PostWithAuthor, UpdatePostInput};

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Request body for editing a post; omitted fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `null` removes the image
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

/// Ids are numeric; anything else cannot name an existing post.
fn parse_post_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Post not found"))
}

/// GET /api/post
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostWithAuthor>>, ApiError> {
    Ok(Json(state.post_service.list().await?))
}

/// GET /api/post/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostWithAuthor>, ApiError> {
    let id = parse_post_id(&id)?;
    state
        .post_service
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

/// POST /api/post
pub async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .post_service
        .create(
            &user,
            CreatePostInput {
                title: body.title,
                content: body.content,
                image: body.image,
            },
        )
        .await?;

    Ok(Json(post))
}

/// PATCH /api/post/{id}
pub async fn update_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_post_id(&id)?;
    let post = state
        .post_service
        .update(
            &user,
            id,
            UpdatePostInput {
                title: body.title,
                content: body.content,
                image: body.image,
            },
        )
        .await?;

    Ok(Json(post))
}

/// DELETE /api/post/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_post_id(&id)?;
    Ok(Json(state.post_service.delete(&user, id).await?))
}
