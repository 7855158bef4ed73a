//! Post repository
//!
//! - `PostRepository` trait defining post data access
//! - `SqlxPostRepository` implementing it for SQLite and MySQL
//!
//! Reads that feed the public endpoints join the author's public fields.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Post, PostAuthor, PostWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "id, title, content, image, user_id, created_at, updated_at";

const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.image, p.user_id, p.created_at, p.updated_at,
           u.name AS author_name, u.image AS author_image
    FROM posts p
    INNER JOIN users u ON u.id = p.user_id
"#;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Fetch a post with its author's public fields
    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>>;

    /// All posts, newest first
    async fn list_with_authors(&self) -> Result<Vec<PostWithAuthor>>;

    /// Persist title, content and image, refreshing `updated_at`
    async fn update(&self, post: &Post) -> Result<Post>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => create_post_mysql(pool, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_post_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_post_mysql(pool, id).await,
        }
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let sql = format!("{} WHERE p.id = ?", POST_WITH_AUTHOR_SELECT);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post with author")?;
                Ok(row.as_ref().map(row_to_post_with_author_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post with author")?;
                Ok(row.as_ref().map(row_to_post_with_author_mysql))
            }
        }
    }

    async fn list_with_authors(&self) -> Result<Vec<PostWithAuthor>> {
        let sql = format!(
            "{} ORDER BY p.created_at DESC, p.id DESC",
            POST_WITH_AUTHOR_SELECT
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_with_author_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                Ok(rows.iter().map(row_to_post_with_author_mysql).collect())
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let sql = "UPDATE posts SET title = ?, content = ?, image = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(&post.image)
                    .bind(now)
                    .bind(post.id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(&post.image)
                    .bind(now)
                    .bind(post.id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
        }

        Ok(Post {
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, image, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image)
    .bind(post.user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_post_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_sqlite))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        image: row.get("image"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_post_with_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> PostWithAuthor {
    let post = row_to_post_sqlite(row);
    PostWithAuthor {
        user: PostAuthor {
            id: post.user_id,
            name: row.get("author_name"),
            image: row.get("author_image"),
        },
        post,
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, image, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image)
    .bind(post.user_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn get_post_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    Ok(row.as_ref().map(row_to_post_mysql))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        image: row.get("image"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_post_with_author_mysql(row: &sqlx::mysql::MySqlRow) -> PostWithAuthor {
    let post = row_to_post_mysql(row);
    PostWithAuthor {
        user: PostAuthor {
            id: post.user_id,
            name: row.get("author_name"),
            image: row.get("author_image"),
        },
        post,
    }
}
