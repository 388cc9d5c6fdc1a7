/// Follow handlers - the follow feed and follow/unfollow actions
use super::{load_posts_page, login_required, render};
use crate::error::{AppError, Result};
use crate::middleware::{profile_url, redirect, Viewer};
use crate::models::{PostScope, User};
use crate::pagination::PageQuery;
use crate::render::FOLLOW_TEMPLATE;
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

/// GET /follow/ - posts by every author the requester follows.
pub async fn follow_index(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    query: PageQuery,
) -> Result<HttpResponse> {
    let user = match login_required(&state, &viewer, &req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    let page_obj = load_posts_page(&state, PostScope::FollowedBy(user.id), query.requested()).await?;

    render(&state, FOLLOW_TEMPLATE, &json!({ "page_obj": page_obj }))
}

async fn find_author(state: &AppState, username: &str) -> Result<User> {
    state
        .repo
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", username)))
}

/// /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match login_required(&state, &viewer, &req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    let author = find_author(&state, &username).await?;
    let created = state.repo.follow(user.id, author.id).await?;
    tracing::info!(
        follower_id = user.id,
        author_id = author.id,
        created,
        "follow requested"
    );

    Ok(redirect(&profile_url(&author.username)))
}

/// /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match login_required(&state, &viewer, &req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    let author = find_author(&state, &username).await?;
    let removed = state.repo.unfollow(user.id, author.id).await?;
    tracing::info!(
        follower_id = user.id,
        author_id = author.id,
        removed,
        "unfollow requested"
    );

    Ok(redirect(&profile_url(&author.username)))
}
