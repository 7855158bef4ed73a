//! Post model
//!
//! A post is a titled text entry with an optional image URL, owned by exactly
//! one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Image URL (an upload under `/uploads/` or any external URL)
    pub image: Option<String>,
    /// Owning user
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Apply a partial update in place.
    pub fn apply(&mut self, input: UpdatePostInput) {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(content) = input.content {
            self.content = content;
        }
        if let Some(image) = input.image {
            self.image = image;
        }
    }
}

/// Public author fields embedded in post reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: i64,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// A post together with its author, as returned by the read endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub user: PostAuthor,
}

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

/// Input for editing a post; `None` fields are left as they are.
///
/// `image: Some(None)` removes the image.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            title: "Morning".to_string(),
            content: "Coffee first".to_string(),
            image: Some("/uploads/a.png".to_string()),
            user_id: 9,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_partial_update() {
        let mut post = sample_post();
        post.apply(UpdatePostInput {
            title: Some("Evening".to_string()),
            ..Default::default()
        });

        assert_eq!(post.title, "Evening");
        assert_eq!(post.content, "Coffee first");
        assert_eq!(post.image.as_deref(), Some("/uploads/a.png"));
    }

    #[test]
    fn test_apply_clears_image() {
        let mut post = sample_post();
        post.apply(UpdatePostInput {
            image: Some(None),
            ..Default::default()
        });

        assert!(post.image.is_none());
    }

    #[test]
    fn test_post_with_author_serializes_flat() {
        let value = serde_json::to_value(PostWithAuthor {
            post: sample_post(),
            user: PostAuthor {
                id: 9,
                name: Some("Pan".to_string()),
                image: None,
            },
        })
        .unwrap();

        assert_eq!(value["title"], "Morning");
        assert_eq!(value["user_id"], 9);
        assert_eq!(value["user"]["name"], "Pan");
    }
}
