use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use quarry_core::persist::load_doc_meta;
use quarry_core::{DocDisplay, Hit, IndexPaths, Searcher, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize {
    10
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub vsm: Vec<RankedDoc>,
    pub qlm: Vec<RankedDoc>,
}

#[derive(Serialize)]
pub struct RankedDoc {
    pub doc_id: String,
    pub score: f64,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<Searcher>,
    pub doc_meta: Arc<BTreeMap<String, DocDisplay>>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // Load the snapshot at startup; a missing index is an operator error
    // here, not a 500 at query time.
    let searcher = Searcher::open(IndexPaths::new(&index_dir))
        .with_context(|| format!("open index at {index_dir} (run the indexer first)"))?;
    let doc_meta = match load_doc_meta(&IndexPaths::new(&index_dir)) {
        Ok(meta) => meta,
        // Display metadata is optional; results fall back to document ids.
        Err(StoreError::MissingIndex { .. }) => BTreeMap::new(),
        Err(err) => return Err(err.into()),
    };
    let state = AppState {
        searcher: Arc::new(searcher),
        doc_meta: Arc::new(doc_meta),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, 100);
    let vsm = state.searcher.score_vsm(&params.q, k);
    let qlm = state.searcher.score_qlm(&params.q, k);
    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        vsm: decorate(vsm, &state.doc_meta),
        qlm: decorate(qlm, &state.doc_meta),
    })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.doc_meta.get(&doc_id) {
        Some(meta) => Ok(Json(serde_json::json!({
            "doc_id": doc_id,
            "title": meta.title,
            "url": meta.url,
        }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

fn decorate(hits: Vec<Hit>, meta: &BTreeMap<String, DocDisplay>) -> Vec<RankedDoc> {
    hits.into_iter()
        .map(|hit| {
            let m = meta.get(&hit.doc_id);
            RankedDoc {
                title: m
                    .map(|m| m.title.clone())
                    .unwrap_or_else(|| hit.doc_id.clone()),
                url: m.and_then(|m| (!m.url.is_empty()).then(|| m.url.clone())),
                doc_id: hit.doc_id,
                score: hit.score,
            }
        })
        .collect()
}
