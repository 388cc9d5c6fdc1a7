/// Comment handlers
use super::{login_required, submitted};
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::middleware::{post_detail_url, redirect, Viewer};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};

/// POST /posts/{post_id}/comment/
///
/// Always lands back on the post; an empty comment is dropped without
/// feedback.
pub async fn add_comment(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    post_id: web::Path<i64>,
    form: Option<web::Form<CommentForm>>,
) -> Result<HttpResponse> {
    let user = match login_required(&state, &viewer, &req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    let post_id = post_id.into_inner();
    let post = state
        .repo
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {}", post_id)))?;

    let form: CommentForm = submitted(form);
    match form.validate() {
        Ok(text) => {
            let comment = state.repo.create_comment(post.id, user.id, &text).await?;
            tracing::info!(
                comment_id = comment.id,
                post_id = post.id,
                author_id = user.id,
                "comment added"
            );
        }
        Err(errors) => {
            tracing::debug!(post_id = post.id, %errors, "comment form rejected");
        }
    }

    Ok(redirect(&post_detail_url(post.id)))
}
