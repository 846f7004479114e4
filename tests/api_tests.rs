//! HTTP-level tests against the router with the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf_server::{
    api,
    config::AppConfig,
    models::AccessClaims,
    repository::Repository,
    services::Services,
    AppState,
};

fn app() -> (Router, String) {
    let mut config = AppConfig::default();
    config.database.url = "memory://".to_string();
    let token = AccessClaims::new("tester", chrono::Duration::hours(1))
        .create_token(&config.auth.jwt_secret)
        .unwrap();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(Services::new(Repository::memory())),
    };
    (api::router(state), token)
}

fn json_request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn book_payload(title: &str) -> Value {
    json!({
        "title": title,
        "publisher": "Publisher Name",
        "author": "Author Name",
        "genre": "Fiction",
        "publication_date": "2022-01-01",
        "word_count": 50000,
        "price": 25.99
    })
}

async fn create(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send(app, json_request(Method::POST, "/api/books", token, Some(book_payload(title)))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_check() {
    let (app, _) = app();
    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_then_get() {
    let (app, token) = app();

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/books", &token, Some(book_payload("Sample Book"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], true);
    assert_eq!(body["errors"], Value::Null);
    assert_eq!(body["notify"], Value::Null);

    let id = body["data"]["id"].as_i64().unwrap();
    let (status, body) = send(&app, json_request(Method::GET, &format!("/api/books/{}", id), &token, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({
            "id": id,
            "title": "Sample Book",
            "publisher": "Publisher Name",
            "author": "Author Name",
            "genre": "Fiction",
            "publication_date": "2022-01-01",
            "word_count": 50000,
            "price": "25.99"
        })
    );
}

#[tokio::test]
async fn test_create_from_form_body() {
    let (app, token) = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/books")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "title=Form+Book&publisher=P&author=A&genre=G&publication_date=2021-05-04&word_count=1200&price=9.5",
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["title"], "Form Book");
    assert_eq!(body["data"]["word_count"], 1200);
    assert_eq!(body["data"]["price"], "9.50");
}

#[tokio::test]
async fn test_create_invalid_payload_is_422() {
    let (app, token) = app();
    let payload = json!({
        "title": "",
        "publisher": "Publisher Name",
        "author": "Author Name",
        "genre": "Fiction",
        "publication_date": "not-a-date",
        "word_count": "many",
        "price": -1
    });

    let (status, body) = send(&app, json_request(Method::POST, "/api/books", &token, Some(payload))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], false);
    assert_eq!(body["data"], Value::Null);
    assert_eq!(body["notify"], Value::Null);

    let errors = body["errors"].as_object().unwrap();
    let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["title", "publication_date", "word_count", "price"]);
    assert!(errors.values().all(Value::is_array));
    assert_eq!(errors["title"], json!(["The title field is required."]));
}

#[tokio::test]
async fn test_missing_book_is_404() {
    let (app, token) = app();

    let (status, body) = send(&app, json_request(Method::GET, "/api/books/999", &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);
    assert_eq!(body["errors"], json!({"book": ["Book not found"]}));

    let (status, _) = send(
        &app,
        json_request(Method::PUT, "/api/books/999", &token, Some(json!({"title": "New"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, json_request(Method::DELETE, "/api/books/999", &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unparsable_id_is_404() {
    let (app, token) = app();

    for uri in ["/api/books/abc", "/api/books/99999999999999999999"] {
        let (status, body) = send(&app, json_request(Method::GET, uri, &token, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["status"], false);
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["errors"], json!({"book": ["Book not found"]}));
    }

    let (status, _) = send(
        &app,
        json_request(Method::PUT, "/api/books/abc", &token, Some(json!({"title": "New"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, json_request(Method::DELETE, "/api/books/abc", &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_changes_supplied_fields() {
    let (app, token) = app();
    let id = create(&app, &token, "Old Title").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/books/{}", id),
            &token,
            Some(json!({"title": "New Title", "price": "10"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["title"], "New Title");
    assert_eq!(body["data"]["price"], "10.00");
    assert_eq!(body["data"]["author"], "Author Name");
}

#[tokio::test]
async fn test_update_with_blank_field_is_422() {
    let (app, token) = app();
    let id = create(&app, &token, "Book").await;

    let (status, body) = send(
        &app,
        json_request(Method::PUT, &format!("/api/books/{}", id), &token, Some(json!({"author": ""}))),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["author"].is_array());
}

#[tokio::test]
async fn test_delete_then_get_is_404() {
    let (app, token) = app();
    let id = create(&app, &token, "Doomed").await;
    let uri = format!("/api/books/{}", id);

    let response = app
        .clone()
        .oneshot(json_request(Method::DELETE, &uri, &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());

    let (status, _) = send(&app, json_request(Method::GET, &uri, &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, json_request(Method::DELETE, &uri, &token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_by_title() {
    let (app, token) = app();
    for title in ["Book 1", "Book 2", "Another"] {
        create(&app, &token, title).await;
    }

    let (status, body) = send(&app, json_request(Method::GET, "/api/books?title=Book", &token, None)).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Newest first
    assert_eq!(items[0]["title"], "Book 2");
    assert_eq!(items[1]["title"], "Book 1");
    assert_eq!(body["data"]["meta"]["total"], 2);
    assert_eq!(body["data"]["filters"], json!(["title"]));
}

#[tokio::test]
async fn test_list_paginates() {
    let (app, token) = app();
    for n in 1..=15 {
        create(&app, &token, &format!("Book {}", n)).await;
    }

    let (status, body) = send(&app, json_request(Method::GET, "/api/books?page=2", &token, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(5));
    assert_eq!(
        body["data"]["meta"],
        json!({"total": 15, "per_page": 10, "current_page": 2, "last_page": 2, "from": 11, "to": 15})
    );
    assert_eq!(body["data"]["links"]["prev"], "/api/books?page=1");
    assert_eq!(body["data"]["links"]["next"], Value::Null);
}

#[tokio::test]
async fn test_unknown_filter_is_reported_in_notify() {
    let (app, token) = app();
    create(&app, &token, "Book").await;

    let (status, body) = send(&app, json_request(Method::GET, "/api/books?genre=sf", &token, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["total"], 1);
    assert_eq!(body["notify"], json!({"info": ["Unknown filter `genre` was ignored"]}));
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let (app, _) = app();
    let request = Request::builder().uri("/api/books").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"message": "Unauthorized"}));
}

#[tokio::test]
async fn test_foreign_token_is_401() {
    let (app, _) = app();
    let token = AccessClaims::new("tester", chrono::Duration::hours(1))
        .create_token("some-other-secret")
        .unwrap();

    let (status, _) = send(&app, json_request(Method::GET, "/api/books", &token, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
