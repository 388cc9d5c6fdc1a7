/// Post handlers - listings, detail, create and edit
use super::{denied, load_posts_page, login_required, render, submitted};
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::middleware::{post_detail_url, profile_url, redirect, require_post_owner, Viewer};
use crate::models::{Group, PostScope, PostView};
use crate::pagination::{PageQuery, Paginator};
use crate::render::{
    GROUP_TEMPLATE, INDEX_TEMPLATE, POST_DETAIL_TEMPLATE, POST_FORM_TEMPLATE, PROFILE_TEMPLATE,
};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

fn form_context(
    form: &PostForm,
    errors: &FormErrors,
    groups: &[Group],
    post: Option<&PostView>,
) -> Value {
    json!({
        "form": {
            "data": form,
            "errors": errors,
            "groups": groups,
        },
        "is_edit": post.is_some(),
        "post": post,
    })
}

/// GET / - every post, newest first. Responses are cached per resolved page.
pub async fn index(state: web::Data<AppState>, query: PageQuery) -> Result<HttpResponse> {
    let key = format!("/?page={}", query.normalized());
    let app: &AppState = &state;
    let requested = query.requested();
    let page = state
        .cache
        .get_or_render(&key, || async move {
            let page_obj = load_posts_page(app, PostScope::All, requested).await?;
            app.renderer
                .render(INDEX_TEMPLATE, &json!({ "page_obj": page_obj }))
        })
        .await?;

    Ok(page.into_response())
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let group = state
        .repo
        .find_group_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Group {}", slug)))?;

    let page_obj = load_posts_page(&state, PostScope::Group(group.id), query.requested()).await?;

    render(
        &state,
        GROUP_TEMPLATE,
        &json!({
            "group": group,
            "page_obj": page_obj,
        }),
    )
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    viewer: Viewer,
    username: web::Path<String>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let author = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", username)))?;

    let page_obj = load_posts_page(&state, PostScope::Author(author.id), query.requested()).await?;

    let following = match viewer.user() {
        Some(user) if user.id != author.id => state.repo.is_following(user.id, author.id).await?,
        _ => false,
    };

    render(
        &state,
        PROFILE_TEMPLATE,
        &json!({
            "username": author.username,
            "post_count": page_obj.count,
            "post_author": author,
            "following": following,
            "page_obj": page_obj,
        }),
    )
}

/// GET /posts/{post_id}/ - the post, its author's post count and a page of comments.
pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: Viewer,
    post_id: web::Path<i64>,
    query: PageQuery,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = state
        .repo
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {}", post_id)))?;

    let author_post_count = state
        .repo
        .count_posts(PostScope::Author(post.author_id))
        .await?;

    let comment_count = state.repo.count_comments(post.id).await?;
    let paginator = Paginator::new(comment_count, state.per_page());
    let window = paginator.window(query.requested());
    let comments = state
        .repo
        .list_comments(post.id, window.offset, window.limit)
        .await?;
    let comments = paginator.page(window, comments);

    let can_edit = viewer
        .user()
        .map(|user| user.id == post.author_id)
        .unwrap_or(false);

    render(
        &state,
        POST_DETAIL_TEMPLATE,
        &json!({
            "this_post": post,
            "author_post_count": author_post_count,
            "comments": comments,
            "comment_form": {
                "data": CommentForm::default(),
                "errors": FormErrors::new(),
            },
            "can_edit": can_edit,
        }),
    )
}

/// GET /create/
pub async fn post_create_page(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(resp) = login_required(&state, &viewer, &req) {
        return Ok(resp);
    }

    let groups = state.repo.list_groups().await?;
    render(
        &state,
        POST_FORM_TEMPLATE,
        &form_context(&PostForm::default(), &FormErrors::new(), &groups, None),
    )
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    form: Option<web::Form<PostForm>>,
) -> Result<HttpResponse> {
    let user = match login_required(&state, &viewer, &req) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };

    let form: PostForm = submitted(form);
    let groups = state.repo.list_groups().await?;
    let input = match form.validate(&groups) {
        Ok(input) => input,
        Err(errors) => {
            tracing::debug!(user_id = user.id, %errors, "post form rejected");
            return render(
                &state,
                POST_FORM_TEMPLATE,
                &form_context(&form, &errors, &groups, None),
            );
        }
    };

    let post = state.repo.create_post(user.id, &input).await?;
    tracing::info!(post_id = post.id, author_id = user.id, label = %post, "post created");

    Ok(redirect(&profile_url(&user.username)))
}

/// Fetch the post and run both gates for an edit request.
async fn editable_post(
    state: &AppState,
    viewer: &Viewer,
    req: &HttpRequest,
    post_id: i64,
) -> Result<std::result::Result<PostView, HttpResponse>> {
    let user = match login_required(state, viewer, req) {
        Ok(user) => user,
        Err(resp) => return Ok(Err(resp)),
    };

    let post = state
        .repo
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Post {}", post_id)))?;

    if let Some(resp) = denied(require_post_owner(&user, &post)) {
        tracing::debug!(post_id, user_id = user.id, "edit by non-author redirected");
        return Ok(Err(resp));
    }

    Ok(Ok(post))
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_page(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post = match editable_post(&state, &viewer, &req, post_id.into_inner()).await? {
        Ok(post) => post,
        Err(resp) => return Ok(resp),
    };

    let groups = state.repo.list_groups().await?;
    let form = PostForm::initial(&post.text, post.group_id);
    render(
        &state,
        POST_FORM_TEMPLATE,
        &form_context(&form, &FormErrors::new(), &groups, Some(&post)),
    )
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: HttpRequest,
    post_id: web::Path<i64>,
    form: Option<web::Form<PostForm>>,
) -> Result<HttpResponse> {
    let post = match editable_post(&state, &viewer, &req, post_id.into_inner()).await? {
        Ok(post) => post,
        Err(resp) => return Ok(resp),
    };

    let form: PostForm = submitted(form);
    let groups = state.repo.list_groups().await?;
    let input = match form.validate(&groups) {
        Ok(input) => input,
        Err(errors) => {
            return render(
                &state,
                POST_FORM_TEMPLATE,
                &form_context(&form, &errors, &groups, Some(&post)),
            );
        }
    };

    if !state.repo.update_post(post.id, &input).await? {
        return Err(AppError::not_found(format!("Post {}", post.id)));
    }
    tracing::info!(post_id = post.id, "post updated");

    Ok(redirect(&post_detail_url(post.id)))
}
