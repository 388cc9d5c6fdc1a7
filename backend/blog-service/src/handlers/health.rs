use crate::error::Result;
use crate::render::NOT_FOUND_TEMPLATE;
use crate::state::AppState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

/// GET /health - liveness plus a repository round trip.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.repo.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "service": "blog-service",
            }))
        }
    }
}

/// Fallback for every unmatched path.
pub async fn not_found(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    tracing::debug!(path = %req.path(), "no route matched");
    let page = state.renderer.render(
        NOT_FOUND_TEMPLATE,
        &json!({
            "error": format!("{} not found", req.path()),
            "status": 404,
        }),
    )?;
    Ok(page.into_response_with_status(StatusCode::NOT_FOUND))
}
