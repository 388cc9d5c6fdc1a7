use super::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentView, Follow, Group, GroupInput, Post, PostInput, PostScope, PostView, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// A post may only point at an existing group.
    fn check_group(&self, group_id: Option<i64>) -> Result<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(AppError::not_found(format!("Group {}", id)))
            }
            _ => Ok(()),
        }
    }

    fn post_view(&self, post: &Post) -> Option<PostView> {
        let author = self.users.get(&post.author_id)?;
        let group = post.group_id.and_then(|id| self.groups.get(&id));
        Some(PostView {
            id: post.id,
            text: post.text.clone(),
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: author.username.clone(),
            group_id: group.map(|g| g.id),
            group_slug: group.map(|g| g.slug.clone()),
            group_title: group.map(|g| g.title.clone()),
            image: post.image.clone(),
        })
    }

    fn in_scope(&self, post: &Post, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Posts in scope, newest first.
    fn scoped_posts(&self, scope: PostScope) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|p| self.in_scope(p, scope))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts
    }
}

/// Process-local repository with the same semantics as the PostgreSQL one,
/// including cascades and `SET NULL` on group deletion.
#[derive(Default)]
pub struct InMemoryBlogRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogRepository for InMemoryBlogRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
        let user = User {
            id: state.allocate_id(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        state.posts.retain(|_, p| p.author_id != user_id);
        let remaining_posts: Vec<i64> = state.posts.keys().copied().collect();
        state
            .comments
            .retain(|_, c| c.author_id != user_id && remaining_posts.contains(&c.post_id));
        state
            .follows
            .retain(|_, f| f.user_id != user_id && f.author_id != user_id);
        Ok(true)
    }

    async fn create_group(&self, input: &GroupInput) -> Result<Group> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == input.slug) {
            return Err(AppError::Conflict(
                "Group with this slug already exists.".to_string(),
            ));
        }
        let group = Group {
            id: state.allocate_id(),
            title: input.title.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, group_id: i64) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.get(&group_id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        for post in state.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&author_id) {
            return Err(AppError::not_found(format!("User {}", author_id)));
        }
        state.check_group(input.group_id)?;
        let post = Post {
            id: state.allocate_id(),
            text: input.text.clone(),
            created_at: Utc::now(),
            author_id,
            group_id: input.group_id,
            image: None,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&post_id).and_then(|p| state.post_view(p)))
    }

    async fn update_post(&self, post_id: i64, input: &PostInput) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Ok(false);
        }
        state.check_group(input.group_id)?;
        match state.posts.get_mut(&post_id) {
            Some(post) => {
                post.text = input.text.clone();
                post.group_id = input.group_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_post_image(&self, post_id: i64, image: Option<&str>) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.posts.get_mut(&post_id) {
            Some(post) => {
                post.image = image.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn count_posts(&self, scope: PostScope) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.posts.values().filter(|p| state.in_scope(p, scope)).count())
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PostView>> {
        let state = self.state.read().await;
        Ok(state
            .scoped_posts(scope)
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|p| state.post_view(p))
            .collect())
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(AppError::not_found(format!("Post {}", post_id)));
        }
        if !state.users.contains_key(&author_id) {
            return Err(AppError::not_found(format!("User {}", author_id)));
        }
        let comment = Comment {
            id: state.allocate_id(),
            post_id,
            author_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn count_comments(&self, post_id: i64) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state.comments.values().filter(|c| c.post_id == post_id).count())
    }

    async fn list_comments(
        &self,
        post_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CommentView>> {
        let state = self.state.read().await;
        let mut comments: Vec<&Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(comments
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|c| {
                let author = state.users.get(&c.author_id)?;
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    author_username: author.username.clone(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
            })
            .collect())
    }

    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) || !state.users.contains_key(&author_id) {
            return Err(AppError::not_found("User"));
        }
        if state
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        let follow = Follow {
            id: state.allocate_id(),
            user_id,
            author_id,
            created_at: Utc::now(),
        };
        state.follows.insert(follow.id, follow);
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryBlogRepository, User, Group) {
        let repo = InMemoryBlogRepository::new();
        let user = repo.create_user("TestUser").await.unwrap();
        let group = repo
            .create_group(&GroupInput {
                title: "Test group".into(),
                slug: "test-slug".into(),
                description: "Test description".into(),
            })
            .await
            .unwrap();
        (repo, user, group)
    }

    fn input(text: &str, group_id: Option<i64>) -> PostInput {
        PostInput {
            text: text.to_string(),
            group_id,
        }
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let (repo, user, _) = seeded().await;
        for i in 1..=3 {
            repo.create_post(user.id, &input(&format!("post {}", i), None))
                .await
                .unwrap();
        }

        let posts = repo.list_posts(PostScope::All, 0, 10).await.unwrap();
        let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["post 3", "post 2", "post 1"]);
    }

    #[tokio::test]
    async fn test_group_deletion_nulls_post_group() {
        let (repo, user, group) = seeded().await;
        let post = repo
            .create_post(user.id, &input("grouped", Some(group.id)))
            .await
            .unwrap();

        assert!(repo.delete_group(group.id).await.unwrap());

        let view = repo.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(view.group_id, None);
        assert_eq!(view.group_slug, None);
        assert_eq!(repo.count_posts(PostScope::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_group_is_rejected() {
        let (repo, user, group) = seeded().await;
        let err = repo
            .create_post(user.id, &input("orphan", Some(group.id + 100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(repo.count_posts(PostScope::All).await.unwrap(), 0);

        let post = repo
            .create_post(user.id, &input("grouped", Some(group.id)))
            .await
            .unwrap();
        let err = repo
            .update_post(post.id, &input("moved", Some(group.id + 100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let view = repo.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(view.text, "grouped");
        assert_eq!(view.group_id, Some(group.id));
    }

    #[tokio::test]
    async fn test_missing_author_is_not_found() {
        let (repo, user, _) = seeded().await;
        let err = repo
            .create_post(user.id + 100, &input("ghost", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let post = repo.create_post(user.id, &input("real", None)).await.unwrap();
        let err = repo
            .create_comment(post.id, user.id + 100, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_deletion_cascades() {
        let (repo, user, _) = seeded().await;
        let other = repo.create_user("SomeDude").await.unwrap();
        let post = repo.create_post(user.id, &input("mine", None)).await.unwrap();
        let kept = repo.create_post(other.id, &input("theirs", None)).await.unwrap();
        repo.create_comment(kept.id, user.id, "nice").await.unwrap();
        repo.create_comment(kept.id, other.id, "thanks").await.unwrap();
        repo.follow(other.id, user.id).await.unwrap();

        assert!(repo.delete_user(user.id).await.unwrap());

        assert!(repo.find_post(post.id).await.unwrap().is_none());
        assert_eq!(repo.count_comments(kept.id).await.unwrap(), 1);
        assert!(!repo.is_following(other.id, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_a_conflict() {
        let (repo, _, _) = seeded().await;
        let err = repo
            .create_group(&GroupInput {
                title: "Another".into(),
                slug: "test-slug".into(),
                description: "dup".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_follow_is_idempotent_and_ignores_self() {
        let (repo, user, _) = seeded().await;
        let author = repo.create_user("author").await.unwrap();

        assert!(repo.follow(user.id, author.id).await.unwrap());
        assert!(!repo.follow(user.id, author.id).await.unwrap());
        assert!(!repo.follow(user.id, user.id).await.unwrap());
        assert!(repo.is_following(user.id, author.id).await.unwrap());
        assert!(!repo.is_following(user.id, user.id).await.unwrap());

        assert!(repo.unfollow(user.id, author.id).await.unwrap());
        assert!(!repo.unfollow(user.id, author.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_feed_scope() {
        let (repo, user, _) = seeded().await;
        let followed = repo.create_user("followed").await.unwrap();
        let stranger = repo.create_user("stranger").await.unwrap();
        repo.create_post(followed.id, &input("from followed", None))
            .await
            .unwrap();
        repo.create_post(stranger.id, &input("from stranger", None))
            .await
            .unwrap();
        repo.follow(user.id, followed.id).await.unwrap();

        let feed = repo
            .list_posts(PostScope::FollowedBy(user.id), 0, 10)
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author_username, "followed");
    }

    #[tokio::test]
    async fn test_post_deletion_removes_comments() {
        let (repo, user, _) = seeded().await;
        let post = repo.create_post(user.id, &input("doomed", None)).await.unwrap();
        repo.create_comment(post.id, user.id, "first").await.unwrap();

        assert!(repo.delete_post(post.id).await.unwrap());
        assert!(!repo.delete_post(post.id).await.unwrap());
        assert_eq!(repo.count_comments(post.id).await.unwrap(), 0);
    }
}
