/// Blog Service Library
///
/// A small blogging application: authors publish posts, optionally into
/// themed groups, comment on each other's posts and follow other authors.
///
/// # Modules
///
/// - `handlers`: page handlers, one per route
/// - `models`: users, groups, posts, comments and follows
/// - `db`: the `BlogRepository` seam with PostgreSQL and in-memory stores
/// - `forms`: submitted field validation
/// - `pagination`: page slicing for every listing
/// - `cache`: time-expiring cache of rendered pages
/// - `render`: the template rendering seam
/// - `middleware`: session resolution, request timing and access gates
/// - `auth`: session token issue and verification
/// - `cli`: operator commands
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors and the `/metrics` handler
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod render;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
