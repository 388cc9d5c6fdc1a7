use super::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, Group, GroupInput, Post, PostInput, PostScope, PostView, User,
};
use async_trait::async_trait;
use sqlx::PgPool;

const POST_VIEW_COLUMNS: &str = r#"
    p.id, p.text, p.created_at, p.author_id, u.username AS author_username,
    p.group_id, g.slug AS group_slug, g.title AS group_title, p.image
"#;

const POST_VIEW_FROM: &str = r#"
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct SqlxBlogRepository {
    pool: PgPool,
}

impl SqlxBlogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `WHERE` fragment for a listing scope. `$1` is always bound, to NULL for
/// the unscoped listing.
fn scope_filter(scope: PostScope) -> (&'static str, Option<i64>) {
    match scope {
        PostScope::All => ("$1::BIGINT IS NULL", None),
        PostScope::Group(group_id) => ("p.group_id = $1", Some(group_id)),
        PostScope::Author(author_id) => ("p.author_id = $1", Some(author_id)),
        PostScope::FollowedBy(user_id) => (
            "p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)",
            Some(user_id),
        ),
    }
}

fn conflict_or(err: sqlx::Error, message: impl Into<String>) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.into())
        }
        _ => AppError::Database(err),
    }
}

/// A foreign key violation means the referenced author, post or group is gone.
fn missing_reference_or(err: sqlx::Error, message: impl Into<String>) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound(message.into())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id, username, created_at
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "A user with that username already exists."))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_group(&self, input: &GroupInput) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "Group with this slug already exists."))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        // posts.group_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM post_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id)
            VALUES ($1, $2, $3)
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(&input.text)
        .bind(author_id)
        .bind(input.group_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            missing_reference_or(
                e,
                format!("User {} or group {:?}", author_id, input.group_id),
            )
        })?;

        Ok(post)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>> {
        let sql = format!(
            "SELECT {} {} WHERE p.id = $1",
            POST_VIEW_COLUMNS, POST_VIEW_FROM
        );
        let post = sqlx::query_as::<_, PostView>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn update_post(&self, post_id: i64, input: &PostInput) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2
            WHERE id = $3
            "#,
        )
        .bind(&input.text)
        .bind(input.group_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_reference_or(e, format!("Group {:?}", input.group_id)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_post_image(&self, post_id: i64, image: Option<&str>) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET image = $1 WHERE id = $2")
            .bind(image)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, scope: PostScope) -> Result<usize> {
        let (filter, param) = scope_filter(scope);
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", filter);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(param)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as usize)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PostView>> {
        let (filter, param) = scope_filter(scope);
        let sql = format!(
            r#"
            SELECT {} {}
            WHERE {}
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#,
            POST_VIEW_COLUMNS, POST_VIEW_FROM, filter
        );
        let posts = sqlx::query_as::<_, PostView>(&sql)
            .bind(param)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            missing_reference_or(e, format!("Post {} or user {}", post_id, author_id))
        })?;

        Ok(comment)
    }

    async fn count_comments(&self, post_id: i64) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as usize)
    }

    async fn list_comments(
        &self,
        post_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username,
                   c.text, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
