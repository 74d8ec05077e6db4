use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use searchpipe_core::{search, Address, InvertedIndex, StaticImportance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Deserialize)]
struct InputDoc {
    url: String,
    #[serde(default)]
    title: String,
    body: String,
}

/// Stored page text, kept for /doc responses and snippet extraction.
#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct DocParams {
    pub address: Address,
}

#[derive(Deserialize)]
pub struct IndexRequest {
    pub address: Address,
    #[serde(default)]
    pub title: String,
    pub body: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub address: Address,
    pub score: f64,
    pub title: String,
    pub snippet: Option<String>,
}

/// Index and document store behind locks so live indexing and searches can
/// interleave. Readers always see a fully applied index mutation, never a
/// half-appended postings list.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RwLock<InvertedIndex>>,
    pub docs: Arc<RwLock<HashMap<Address, StoredDoc>>>,
    pub importance: Arc<StaticImportance>,
    pub admin_token: Option<String>,
}

/// Build the router, reading the admin token from ADMIN_TOKEN.
pub fn build_app(docs_path: &str, importance_path: Option<&str>) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    build_app_with_token(docs_path, importance_path, admin_token)
}

pub fn build_app_with_token(
    docs_path: &str,
    importance_path: Option<&str>,
    admin_token: Option<String>,
) -> Result<Router> {
    let mut index = InvertedIndex::new();
    let mut docs: HashMap<Address, StoredDoc> = HashMap::new();
    for file in doc_files(Path::new(docs_path))? {
        load_file(&file, &mut index, &mut docs)?;
    }
    let importance = match importance_path {
        Some(path) => StaticImportance::from_path(path)?,
        None => StaticImportance::default(),
    };
    tracing::info!(
        docs = docs.len(),
        tokens = index.len(),
        scores = importance.len(),
        "index loaded"
    );

    let state = AppState {
        index: Arc::new(RwLock::new(index)),
        docs: Arc::new(RwLock::new(docs)),
        importance: Arc::new(importance),
        admin_token,
    };

    // CORS: CORS_ALLOW_ORIGIN comma list, or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
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
        .route("/doc", get(doc_handler))
        .route("/index", post(index_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let hits = {
        let index = state.index.read();
        search(&params.q, &index, state.importance.as_ref())
    };
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);

    let docs = state.docs.read();
    let results = hits
        .into_iter()
        .take(k)
        .map(|hit| {
            let meta = docs.get(&hit.address);
            SearchHit {
                title: meta.map(|d| d.title.clone()).unwrap_or_default(),
                snippet: meta.and_then(|d| snippet(&d.body, &params.q)),
                address: hit.address,
                score: hit.score,
            }
        })
        .collect();

    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits,
        results,
    })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Query(params): Query<DocParams>,
) -> Json<serde_json::Value> {
    let docs = state.docs.read();
    match docs.get(&params.address) {
        Some(doc) => Json(serde_json::json!({
            "address": params.address,
            "title": doc.title,
            "body": doc.body,
        })),
        None => Json(serde_json::json!({ "error": "not found" })),
    }
}

/// Live document ingestion. Additive and idempotent per (address, token),
/// so re-posting a document is safe.
async fn index_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IndexRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    state.index.write().index_document(&req.address, &req.body);
    state
        .docs
        .write()
        .insert(req.address.clone(), StoredDoc { title: req.title, body: req.body });
    Ok(Json(serde_json::json!({ "indexed": req.address })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers
        .get("X-ADMIN-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// A single file, or every .json/.jsonl directly under a directory.
fn doc_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let p = entry?.path();
        if p.is_file()
            && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl"))
        {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}

fn load_file(
    file: &Path,
    index: &mut InvertedIndex,
    docs: &mut HashMap<Address, StoredDoc>,
) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)?;
        index.index_document(&doc.url, &doc.body);
        docs.insert(doc.url, StoredDoc { title: doc.title, body: doc.body });
    }
    Ok(())
}

/// Window of the stored body around the first case-insensitive match of
/// `term`, with matches wrapped in <em> tags. Falls back to the leading
/// text when the term only matched after normalization.
fn snippet(text: &str, term: &str) -> Option<String> {
    if text.is_empty() || term.trim().is_empty() {
        return None;
    }
    let window = match find_case_insensitive(text, term) {
        Some(idx) => {
            let idx = idx.min(text.len());
            let start = char_floor(text, idx.saturating_sub(100));
            let end = char_floor(text, (idx + 200).min(text.len()));
            &text[start..end]
        }
        None => {
            let end = text
                .char_indices()
                .nth(200)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            &text[..end]
        }
    };
    Some(highlight(window, term))
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_lowercase().find(&needle.to_lowercase())
}

// lower-casing can shift byte offsets, so clamp to a char boundary
fn char_floor(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn highlight(window: &str, term: &str) -> String {
    let pat = match regex::RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(p) => p,
        Err(_) => return window.to_string(),
    };
    pat.replace_all(window, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0]))
        .to_string()
}
