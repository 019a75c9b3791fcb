use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use quarry_core::persist::{save_doc_meta, IndexPaths};
use quarry_core::{build_index, BuildConfig, DocDisplay};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(corpus: &Path, index: &Path) {
    fs::write(
        corpus.join("doc1.html"),
        "<html><body>cat dog cat</body></html>",
    )
    .unwrap();
    fs::write(corpus.join("doc2.html"), "<html><body>dog bird</body></html>").unwrap();

    let paths = IndexPaths::new(index);
    build_index(&BuildConfig::new(corpus), &paths).unwrap();

    let mut meta: BTreeMap<String, DocDisplay> = BTreeMap::new();
    meta.insert(
        "doc1".to_string(),
        DocDisplay {
            title: "About cats".to_string(),
            url: "https://example.com/cats".to_string(),
        },
    );
    save_doc_meta(&paths, &meta).unwrap();
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_both_models() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(corpus.path(), index.path());
    let app = quarry_server::build_app(index.path().to_string_lossy().to_string()).unwrap();

    let (status, json) = get(app, "/search?q=cat&k=5").await;
    assert_eq!(status, StatusCode::OK);

    let vsm = json["vsm"].as_array().unwrap();
    assert_eq!(vsm.len(), 1);
    assert_eq!(vsm[0]["doc_id"], "doc1");
    assert_eq!(vsm[0]["title"], "About cats");
    assert_eq!(vsm[0]["url"], "https://example.com/cats");

    let qlm = json["qlm"].as_array().unwrap();
    assert_eq!(qlm.len(), 2);
    assert_eq!(qlm[0]["doc_id"], "doc1");
    // No display metadata for doc2: the id stands in for the title.
    assert_eq!(qlm[1]["title"], "doc2");
    assert_eq!(qlm[1]["url"], Value::Null);
}

#[tokio::test]
async fn empty_query_yields_empty_result_lists() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(corpus.path(), index.path());
    let app = quarry_server::build_app(index.path().to_string_lossy().to_string()).unwrap();

    let (status, json) = get(app, "/search?q=&k=5").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["vsm"].as_array().unwrap().is_empty());
    assert!(json["qlm"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_endpoint_serves_metadata_or_404() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    build_tiny_index(corpus.path(), index.path());

    let app = quarry_server::build_app(index.path().to_string_lossy().to_string()).unwrap();
    let (status, json) = get(app, "/doc/doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "About cats");

    let app = quarry_server::build_app(index.path().to_string_lossy().to_string()).unwrap();
    let (status, _) = get(app, "/doc/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn startup_fails_without_an_index() {
    let index = tempdir().unwrap();
    let err = quarry_server::build_app(index.path().to_string_lossy().to_string());
    assert!(err.is_err());
}
