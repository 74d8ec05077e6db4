use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_store(dir: &std::path::Path) -> (String, String) {
    let docs_path = dir.join("crawl.jsonl");
    let docs = [
        json!({
            "id": "p1",
            "url": "http://example.com/page1",
            "title": "Page 1",
            "body": "Java is a powerful programming language for distributed systems.",
            "timestamp": "2024-01-01T00:00:00Z"
        }),
        json!({
            "id": "p2",
            "url": "http://example.com/page2",
            "title": "Page 2",
            "body": "Python is great for data science and machine learning.",
            "timestamp": "2024-01-01T00:00:00Z"
        }),
        json!({
            "id": "p3",
            "url": "http://example.com/page3",
            "title": "Page 3",
            "body": "Large scale systems often use Java or C++.",
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    ];
    let lines: Vec<String> = docs.iter().map(|d| d.to_string()).collect();
    fs::write(&docs_path, lines.join("\n")).unwrap();

    let ranks_path = dir.join("ranks.json");
    fs::write(
        &ranks_path,
        json!({
            "http://example.com/page1": 0.85,
            "http://example.com/page2": 0.70,
            "http://example.com/page3": 0.95
        })
        .to_string(),
    )
    .unwrap();

    (
        docs_path.to_string_lossy().to_string(),
        ranks_path.to_string_lossy().to_string(),
    )
}

fn build(dir: &std::path::Path, admin_token: Option<&str>) -> Router {
    let (docs, ranks) = write_store(dir);
    searchpipe_server::build_app_with_token(
        &docs,
        Some(ranks.as_str()),
        admin_token.map(String::from),
    )
    .unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let (status, body) = get(build(dir.path(), None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_ranks_by_importance() {
    let dir = tempdir().unwrap();
    let (status, body) = get(build(dir.path(), None), "/search?q=java&k=10").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 2);
    let results = json["results"].as_array().unwrap();
    // page3 (0.95) outranks page1 (0.85); page2 has no "java"
    assert_eq!(results[0]["address"], "http://example.com/page3");
    assert_eq!(results[1]["address"], "http://example.com/page1");
    assert!(results[0]["snippet"]
        .as_str()
        .unwrap()
        .contains("<em>Java</em>"));
}

#[tokio::test]
async fn unknown_query_returns_empty_results() {
    let dir = tempdir().unwrap();
    let (status, body) = get(build(dir.path(), None), "/search?q=golang").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_lookup_round_trips() {
    let dir = tempdir().unwrap();
    let app = build(dir.path(), None);
    let (status, body) = get(app.clone(), "/doc?address=http%3A%2F%2Fexample.com%2Fpage2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Page 2");

    let (_, body) = get(app, "/doc?address=http%3A%2F%2Fexample.com%2Fmissing").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not found");
}

#[tokio::test]
async fn live_indexing_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    let app = build(dir.path(), Some("secret"));
    let doc = json!({
        "address": "http://example.com/page4",
        "title": "Page 4",
        "body": "Rust for search pipelines"
    })
    .to_string();

    let denied = app
        .clone()
        .oneshot(
            Request::post("/index")
                .header("content-type", "application/json")
                .body(Body::from(doc.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let accepted = app
        .clone()
        .oneshot(
            Request::post("/index")
                .header("content-type", "application/json")
                .header("X-ADMIN-TOKEN", "secret")
                .body(Body::from(doc))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);

    // the new document is immediately searchable
    let (_, body) = get(app, "/search?q=rust").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["address"], "http://example.com/page4");
}
