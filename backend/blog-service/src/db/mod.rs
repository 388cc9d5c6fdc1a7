/// Database access layer
///
/// This module provides:
/// - `BlogRepository`, the persistence seam every handler goes through
/// - `SqlxBlogRepository`, the PostgreSQL implementation
/// - `InMemoryBlogRepository`, a process-local implementation for tests and demos
/// - Connection pool creation and embedded migrations
pub mod memory;
pub mod pg;

pub use memory::InMemoryBlogRepository;
pub use pg::SqlxBlogRepository;

use crate::config::{DatabaseConfig, StorageBackend};
use crate::error::Result;
use crate::models::{
    Comment, CommentView, Group, GroupInput, Post, PostInput, PostScope, PostView, User,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Storage operations used by the request path and operator commands.
///
/// Listings are always newest first (creation time, then id, descending).
/// Implementations report duplicate usernames/slugs as `AppError::Conflict`.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<()>;

    async fn create_user(&self, username: &str) -> Result<User>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>>;
    /// Removes the user together with their posts, comments and follows.
    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    async fn create_group(&self, input: &GroupInput) -> Result<Group>;
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;
    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>>;
    /// All groups ordered by title, used as form choices.
    async fn list_groups(&self) -> Result<Vec<Group>>;
    /// Removes the group; its posts stay with `group_id = NULL`.
    async fn delete_group(&self, group_id: i64) -> Result<bool>;

    async fn create_post(&self, author_id: i64, input: &PostInput) -> Result<Post>;
    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>>;
    /// Overwrites text and group in place. Returns false if the post is gone.
    async fn update_post(&self, post_id: i64, input: &PostInput) -> Result<bool>;
    async fn set_post_image(&self, post_id: i64, image: Option<&str>) -> Result<bool>;
    /// Removes the post and its comments.
    async fn delete_post(&self, post_id: i64) -> Result<bool>;
    async fn count_posts(&self, scope: PostScope) -> Result<usize>;
    async fn list_posts(
        &self,
        scope: PostScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PostView>>;

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment>;
    async fn count_comments(&self, post_id: i64) -> Result<usize>;
    async fn list_comments(
        &self,
        post_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CommentView>>;

    /// Returns true if a new follow link was created. Following yourself or
    /// following twice is a no-op.
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool>;
    /// Returns true if a follow link was removed.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool>;
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;
}

/// Create the PostgreSQL pool described by `config`
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max = config.max_connections,
        min = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("Database pool created and verified");
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Build the repository selected by `config.backend`.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn BlogRepository>> {
    match config.backend {
        StorageBackend::Postgres => {
            let pool = create_pool(config).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(SqlxBlogRepository::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryBlogRepository::new()))
        }
    }
}
