/// Template rendering seam
///
/// Handlers never build response bodies themselves: they hand a template name
/// and a context to a [`Renderer`]. The bundled [`JsonRenderer`] serializes the
/// pair as JSON so an HTML templating process (or a test) can consume it.
use crate::error::Result;
use crate::metrics;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use bytes::Bytes;
use serde_json::Value;

pub const INDEX_TEMPLATE: &str = "posts/index.html";
pub const GROUP_TEMPLATE: &str = "posts/group_list.html";
pub const PROFILE_TEMPLATE: &str = "posts/profile.html";
pub const POST_DETAIL_TEMPLATE: &str = "posts/post_detail.html";
pub const POST_FORM_TEMPLATE: &str = "posts/create_post.html";
pub const FOLLOW_TEMPLATE: &str = "posts/follow.html";
pub const NOT_FOUND_TEMPLATE: &str = "core/404.html";
pub const SERVER_ERROR_TEMPLATE: &str = "core/500.html";

/// A rendered response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub body: Bytes,
    pub content_type: String,
}

impl RenderedPage {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(body, "application/json")
    }

    pub fn into_response(self) -> HttpResponse {
        self.into_response_with_status(StatusCode::OK)
    }

    pub fn into_response_with_status(self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status)
            .content_type(self.content_type)
            .body(self.body)
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<RenderedPage>;
}

/// Emits `{"template": ..., "context": ...}` as `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<RenderedPage> {
        let body = serde_json::to_vec(&serde_json::json!({
            "template": template,
            "context": context,
        }))?;
        metrics::record_render(template);
        Ok(RenderedPage::json(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_renderer_wraps_template_and_context() {
        let page = JsonRenderer
            .render(INDEX_TEMPLATE, &serde_json::json!({"count": 3}))
            .unwrap();
        assert_eq!(page.content_type, "application/json");

        let value: Value = serde_json::from_slice(&page.body).unwrap();
        assert_eq!(value["template"], INDEX_TEMPLATE);
        assert_eq!(value["context"]["count"], 3);
    }
}
