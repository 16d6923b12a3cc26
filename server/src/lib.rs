use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use stemdex::index::ChainStats;
use stemdex::persist::{load_index, load_meta, IndexPaths, MetaFile};
use stemdex::{search_with, DocId, HashIndex, IndexError, UnknownOperatorPolicy};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Skip unknown operators instead of rejecting the query
    #[serde(default)]
    pub ignore_unknown: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub doc_ids: Vec<DocId>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub meta: Option<MetaFile>,
    pub buckets: usize,
    pub chains: ChainStats,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<HashIndex>,
    pub meta: Option<MetaFile>,
}

pub fn build_app<P: AsRef<Path>>(index_dir: P) -> Result<Router> {
    // Load the whole index at startup; it is read-only afterwards
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    let meta = match load_meta(&paths) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "index has no readable meta.json");
            None
        }
    };
    tracing::info!(terms = index.len(), buckets = index.bucket_count(), "index loaded");
    Ok(router(AppState { index: Arc::new(index), meta }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
        .layer(cors_from_env())
        .layer(TraceLayer::new_for_http())
}

// CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
fn cors_from_env() -> CorsLayer {
    let any = || CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                any()
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => any(),
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let policy = if params.ignore_unknown { UnknownOperatorPolicy::Ignore } else { UnknownOperatorPolicy::Reject };
    let hits = search_with(&state.index, &params.q, policy).map_err(|e| match e {
        IndexError::UnknownOperator(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;
    let doc_ids: Vec<DocId> = hits.into_iter().collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: doc_ids.len(), doc_ids }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse { meta: state.meta.clone(), buckets: state.index.bucket_count(), chains: state.index.stats() })
}
