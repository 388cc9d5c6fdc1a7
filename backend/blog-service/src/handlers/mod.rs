/// HTTP handlers for blog-service
///
/// This module contains handlers for:
/// - Posts: listings (index, group, profile), detail, create and edit
/// - Comments: adding a comment to a post
/// - Follows: the follow feed and follow/unfollow actions
/// - Health: liveness and the 404 fallback
pub mod comments;
pub mod follows;
pub mod health;
pub mod posts;

pub use comments::add_comment;
pub use follows::{follow_index, profile_follow, profile_unfollow};
pub use health::{health, not_found};
pub use posts::{
    group_posts, index, post_create, post_create_page, post_detail, post_edit, post_edit_page,
    profile,
};

use crate::error::Result;
use crate::auth::AuthUser;
use crate::middleware::{redirect, require_login, AccessDecision, Viewer};
use crate::models::{PostScope, PostView};
use crate::pagination::{Page, Paginator};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;

/// One page of posts in `scope`, newest first.
pub(crate) async fn load_posts_page(
    state: &AppState,
    scope: PostScope,
    requested: Option<&str>,
) -> Result<Page<PostView>> {
    let count = state.repo.count_posts(scope).await?;
    let paginator = Paginator::new(count, state.per_page());
    let window = paginator.window(requested);
    let posts = state
        .repo
        .list_posts(scope, window.offset, window.limit)
        .await?;
    Ok(paginator.page(window, posts))
}

pub(crate) fn render(state: &AppState, template: &str, context: &Value) -> Result<HttpResponse> {
    Ok(state.renderer.render(template, context)?.into_response())
}

/// Request path including the query string, as used for `next` and cache keys.
pub(crate) fn path_and_query(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}

/// The response for a denied decision, `None` when allowed.
pub(crate) fn denied(decision: AccessDecision) -> Option<HttpResponse> {
    match decision {
        AccessDecision::Allowed => None,
        AccessDecision::RedirectTo(target) => Some(redirect(&target)),
    }
}

/// Resolve the requester or the login redirect for this request.
pub(crate) fn login_required(
    state: &AppState,
    viewer: &Viewer,
    req: &HttpRequest,
) -> std::result::Result<AuthUser, HttpResponse> {
    let decision = require_login(viewer, &path_and_query(req), &state.config.auth.login_url);
    match (decision, viewer.user()) {
        (AccessDecision::Allowed, Some(user)) => Ok(user.clone()),
        (AccessDecision::RedirectTo(target), _) => Err(redirect(&target)),
        (AccessDecision::Allowed, None) => Err(redirect(&state.config.auth.login_url)),
    }
}

/// Submitted fields, or an empty submission when the body is not a
/// urlencoded form. Handlers call this only after their access gates.
pub(crate) fn submitted<T: Default>(form: Option<web::Form<T>>) -> T {
    form.map(web::Form::into_inner).unwrap_or_default()
}
