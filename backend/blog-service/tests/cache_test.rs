/// Integration tests for the index page cache
#[macro_use]
mod common;

use actix_web::test::{self, TestRequest};
use common::*;
use std::time::Duration;

#[actix_web::test]
async fn test_index_is_served_from_cache_until_cleared() {
    let state = test_state();
    let author = create_user(&state, "author").await;
    let post = create_post(&state, &author, "Cached post", None).await;
    let app = init_app!(state);

    let first = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;

    assert!(state.repo.delete_post(post.id).await.unwrap());

    let second = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    assert_eq!(first, second);

    state.cache.clear();

    let third = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    assert_ne!(first, third);
}

#[actix_web::test]
async fn test_index_cache_expires() {
    let mut config = test_config();
    config.cache.page_ttl_secs = 1;
    let state = blog_service::AppState::in_memory(config);
    let author = create_user(&state, "author").await;
    let app = init_app!(state);

    let first = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    create_post(&state, &author, "Late post", None).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let second = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    assert_ne!(first, second);
}

#[actix_web::test]
async fn test_cache_is_keyed_by_query() {
    let state = test_state();
    let author = create_user(&state, "author").await;
    for i in 0..11 {
        create_post(&state, &author, &format!("Post {}", i), None).await;
    }
    let app = init_app!(state);

    let page_one = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    let page_two =
        test::call_and_read_body(&app, TestRequest::get().uri("/?page=2").to_request()).await;
    assert_ne!(page_one, page_two);
    assert_eq!(state.cache.len(), 2);
}

#[actix_web::test]
async fn test_other_listings_are_not_cached() {
    let state = test_state();
    let author = create_user(&state, "author").await;
    let app = init_app!(state);

    let first = test::call_and_read_body(
        &app,
        TestRequest::get().uri("/profile/author/").to_request(),
    )
    .await;
    create_post(&state, &author, "Fresh", None).await;
    let second = test::call_and_read_body(
        &app,
        TestRequest::get().uri("/profile/author/").to_request(),
    )
    .await;

    assert_ne!(first, second);
    assert!(state.cache.is_empty());
}

#[actix_web::test]
async fn test_unrelated_query_parameters_share_one_entry() {
    let state = test_state();
    let author = create_user(&state, "author").await;
    create_post(&state, &author, "Only post", None).await;
    let app = init_app!(state);

    let plain = test::call_and_read_body(&app, TestRequest::get().uri("/").to_request()).await;
    for i in 0..500 {
        let uri = format!("/?junk={}", i);
        let body = test::call_and_read_body(&app, TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(body, plain);
    }
    for uri in ["/?page=1", "/?page=0", "/?page=abc", "/?page=1&page=2"] {
        test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
    }

    assert_eq!(state.cache.len(), 1);
}

#[actix_web::test]
async fn test_cache_never_exceeds_entry_limit() {
    let mut config = test_config();
    config.cache.max_entries = 3;
    let state = blog_service::AppState::in_memory(config);
    let app = init_app!(state);

    for page in 1..=10 {
        let uri = format!("/?page={}", page);
        test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
        assert!(state.cache.len() <= 3);
    }
    assert_eq!(state.cache.len(), 3);
}
