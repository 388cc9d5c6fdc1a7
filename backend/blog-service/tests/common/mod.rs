//! Shared fixtures for the HTTP integration tests.
#![allow(dead_code)]

use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test::TestRequest;
pub use blog_service::db::BlogRepository;
use blog_service::models::{Group, GroupInput, Post, PostInput, User};
use blog_service::{AppState, Config};

/// Build the full application over `$state` and initialise it as a test service.
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .wrap(blog_service::middleware::SessionMiddleware::new(
                    $state.sessions.clone(),
                    &$state.config.auth.session_cookie,
                ))
                .configure(blog_service::routes::configure_routes),
        )
        .await
    };
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.backend = blog_service::config::StorageBackend::Memory;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

pub fn test_state() -> AppState {
    AppState::in_memory(test_config())
}

pub async fn create_user(state: &AppState, username: &str) -> User {
    state
        .repo
        .create_user(username)
        .await
        .expect("create user")
}

pub async fn create_group(state: &AppState, slug: &str) -> Group {
    state
        .repo
        .create_group(&GroupInput {
            title: format!("Group {}", slug),
            slug: slug.to_string(),
            description: "Test description".to_string(),
        })
        .await
        .expect("create group")
}

pub async fn create_post(state: &AppState, author: &User, text: &str, group: Option<&Group>) -> Post {
    state
        .repo
        .create_post(
            author.id,
            &PostInput {
                text: text.to_string(),
                group_id: group.map(|g| g.id),
            },
        )
        .await
        .expect("create post")
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state.sessions.issue(user).expect("issue token")
}

pub fn authed_get(uri: &str, token: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
}

pub fn authed_post(uri: &str, token: &str) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .expect("ascii Location")
        .to_string()
}
