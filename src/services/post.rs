//! Post service
//!
//! Listing, reading, creating, editing and deleting posts. Writes are always
//! performed on behalf of an already-authenticated user; edits and deletes
//! are limited to the post's owner.

use crate::db::repositories::PostRepository;
use crate::models::{CreatePostInput, Post, PostWithAuthor, UpdatePostInput, User};
use crate::services::normalize_image;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const MIN_TITLE_LENGTH: usize = 2;
const MIN_CONTENT_LENGTH: usize = 2;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Post not found: {0}")]
    NotFound(i64),

    /// The acting user does not own the post
    #[error("Not allowed to modify post {0}")]
    Forbidden(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn validate_field(field: &str, value: &str, min: usize) -> Result<(), PostServiceError> {
    if value.trim().chars().count() < min {
        return Err(PostServiceError::ValidationError(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    Ok(())
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// All posts with their authors, newest first
    pub async fn list(&self) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        let posts = self
            .repo
            .list_with_authors()
            .await
            .context("Failed to list posts")?;
        Ok(posts)
    }

    /// A single post with its author, or `None` for an unknown id
    pub async fn get(&self, id: i64) -> Result<Option<PostWithAuthor>, PostServiceError> {
        let post = self
            .repo
            .get_with_author(id)
            .await
            .context("Failed to get post")?;
        Ok(post)
    }

    /// Create a post owned by `author`
    pub async fn create(
        &self,
        author: &User,
        input: CreatePostInput,
    ) -> Result<Post, PostServiceError> {
        validate_field("Title", &input.title, MIN_TITLE_LENGTH)?;
        validate_field("Content", &input.content, MIN_CONTENT_LENGTH)?;

        let now = Utc::now();
        let post = Post {
            id: 0,
            title: input.title,
            content: input.content,
            image: normalize_image(input.image),
            user_id: author.id,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&post)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = created.id, user_id = author.id, "Post created");
        Ok(created)
    }

    /// Apply a partial edit to a post owned by `actor`
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        mut input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        if let Some(title) = &input.title {
            validate_field("Title", title, MIN_TITLE_LENGTH)?;
        }
        if let Some(content) = &input.content {
            validate_field("Content", content, MIN_CONTENT_LENGTH)?;
        }
        input.image = input.image.map(normalize_image);

        let mut post = self.owned_post(actor, id).await?;
        post.apply(input);

        let updated = self
            .repo
            .update(&post)
            .await
            .context("Failed to update post")?;
        Ok(updated)
    }

    /// Delete a post owned by `actor`, returning the removed row
    pub async fn delete(&self, actor: &User, id: i64) -> Result<Post, PostServiceError> {
        let post = self.owned_post(actor, id).await?;

        let deleted = self.repo.delete(id).await.context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(id));
        }

        tracing::info!(post_id = id, user_id = actor.id, "Post deleted");
        Ok(post)
    }

    async fn owned_post(&self, actor: &User, id: i64) -> Result<Post, PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))?;

        if !actor.owns(post.user_id) {
            tracing::warn!(post_id = id, user_id = actor.id, "Rejected edit of foreign post");
            return Err(PostServiceError::Forbidden(id));
        }
        Ok(post)
    }
}
