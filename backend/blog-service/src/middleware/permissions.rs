/// Access control for blog-service
///
/// Both gates answer with an [`AccessDecision`] instead of an error: a denied
/// requester is sent somewhere else, never shown an error page.
use actix_web::http::header;
use actix_web::HttpResponse;

use crate::auth::AuthUser;
use crate::middleware::Viewer;
use crate::models::PostView;

/// Outcome of a permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    RedirectTo(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }
}

/// Authentication gate: anonymous requesters go to the login page with the
/// original path and query as `next`.
pub fn require_login(viewer: &Viewer, path_and_query: &str, login_url: &str) -> AccessDecision {
    if viewer.is_authenticated() {
        AccessDecision::Allowed
    } else {
        AccessDecision::RedirectTo(login_redirect(login_url, path_and_query))
    }
}

/// Ownership gate: only the author may edit; anyone else is sent back to the
/// read-only detail view.
pub fn require_post_owner(user: &AuthUser, post: &PostView) -> AccessDecision {
    if post.author_id == user.id {
        AccessDecision::Allowed
    } else {
        AccessDecision::RedirectTo(post_detail_url(post.id))
    }
}

pub fn login_redirect(login_url: &str, next: &str) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    // Slashes stay readable in the return path.
    let next = urlencoding::encode(next).replace("%2F", "/");
    format!("{}{}next={}", login_url, separator, next)
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// 302 to `target`
pub fn redirect(target: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, target))
        .finish()
}
