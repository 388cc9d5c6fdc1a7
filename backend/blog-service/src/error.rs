/// Error types for blog-service
///
/// Every failure is scoped to a single request. Handler errors are converted
/// into rendered error pages; validation failures never reach this type, they
/// re-render the submitted form instead.
use actix_web::{http::header::ContentType, http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A write violated a uniqueness constraint (duplicate slug, username...)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    fn template(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "core/404.html",
            _ => "core/500.html",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Render(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Server-side details stay in the log.
        let message = match self {
            AppError::NotFound(what) => what.clone(),
            AppError::Conflict(what) => what.clone(),
            _ => "Internal server error".to_string(),
        };

        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(
                serde_json::json!({
                    "template": self.template(),
                    "context": {
                        "error": message,
                        "status": status.as_u16(),
                    },
                })
                .to_string(),
            )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Render(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::not_found("Post 7");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not found: Post 7");
    }

    #[test]
    fn test_database_error_maps_to_500() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = AppError::Conflict("Group with this slug already exists.".into());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
