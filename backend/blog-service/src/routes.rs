//! Route configuration
//!
//! Trailing slashes are part of every page route; `/health` and `/metrics`
//! follow the service convention without one.

use crate::error::AppError;
use crate::handlers;
use crate::metrics::serve_metrics;
use actix_web::{error::PathError, web, HttpRequest};

/// A path segment that does not parse (`/posts/abc/`) names no object.
fn path_not_found(err: PathError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "unparsable path segment");
    AppError::not_found(format!("{} not found", req.path())).into()
}

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(path_not_found));

    cfg
        // Operational endpoints
        .route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(serve_metrics))
        // Listings
        .route("/", web::get().to(handlers::index))
        .route("/group/{slug}/", web::get().to(handlers::group_posts))
        .route("/profile/{username}/", web::get().to(handlers::profile))
        .route("/follow/", web::get().to(handlers::follow_index))
        // Posts
        .service(
            web::resource("/create/")
                .route(web::get().to(handlers::post_create_page))
                .route(web::post().to(handlers::post_create)),
        )
        .route("/posts/{post_id}/", web::get().to(handlers::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(handlers::post_edit_page))
                .route(web::post().to(handlers::post_edit)),
        )
        .route(
            "/posts/{post_id}/comment/",
            web::post().to(handlers::add_comment),
        )
        // Follows
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(handlers::profile_follow))
                .route(web::post().to(handlers::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(handlers::profile_unfollow))
                .route(web::post().to(handlers::profile_unfollow)),
        )
        .default_service(web::to(handlers::not_found));
}
