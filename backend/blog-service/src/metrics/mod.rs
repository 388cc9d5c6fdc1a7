//! Prometheus metrics for blog-service.
//!
//! Page cache counters live next to the cache; this module owns the render
//! counters and the `/metrics` handler.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    pub static ref RENDERED_PAGES: IntCounterVec = register_int_counter_vec!(
        "blog_rendered_pages_total",
        "Pages rendered, by template",
        &["template"]
    )
    .expect("Failed to register blog_rendered_pages_total");
}

pub fn record_render(template: &str) {
    RENDERED_PAGES.with_label_values(&[template]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
