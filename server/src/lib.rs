use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wikirel_core::category::distance::category_distances;
use wikirel_core::category::similarity::{category_most_similar, category_similarity};
use wikirel_core::persist::{self, GraphMeta, GraphPaths};
use wikirel_core::store::SledStore;
use wikirel_core::{
    CategoryGraph, CategoryGraphBuilder, CategoryMemberSource, ExplanationFormatter, Language, LinkDirection, MilneWittenMetric,
    PageId, PageSource, SrResult,
};

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct SimilarityParams {
    pub lang: Language,
    pub a: PageId,
    pub b: PageId,
    #[serde(default)]
    pub out_links: bool,
    #[serde(default)]
    pub explain: bool,
    /// Average of in-link and out-link scores; `out_links` is ignored.
    #[serde(default)]
    pub combined: bool,
}

#[derive(Deserialize)]
pub struct PairParams {
    pub lang: Language,
    pub a: PageId,
    pub b: PageId,
}

#[derive(Deserialize)]
pub struct MostSimilarParams {
    pub lang: Language,
    pub id: PageId,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default)]
    pub out_links: bool,
}

#[derive(Deserialize)]
pub struct TopParams {
    #[serde(default = "default_n")]
    pub n: usize,
}

#[derive(Deserialize)]
pub struct DistanceParams {
    pub lang: Language,
    pub id: PageId,
    /// Comma-separated category page ids.
    pub goals: String,
    #[serde(default)]
    pub weighted: bool,
}

fn default_n() -> usize { 10 }

#[derive(Serialize)]
pub struct SimilarityResponse {
    /// `null` when the measure is undefined for the pair.
    pub score: Option<f64>,
    pub explanations: Vec<ExplanationView>,
}

#[derive(Serialize)]
pub struct ExplanationView {
    pub template: wikirel_core::ExplanationTemplate,
    pub refs: Vec<PageId>,
    pub text: String,
}

#[derive(Serialize)]
pub struct ScoredPage {
    pub id: PageId,
    pub title: Option<String>,
    pub score: Option<f64>,
}

#[derive(Serialize)]
pub struct CategoryView {
    pub id: PageId,
    pub name: String,
    pub cost: Option<f64>,
}

type Graphs = Arc<RwLock<HashMap<Language, Arc<CategoryGraph>>>>;
type RebuildLocks = Arc<Mutex<HashMap<Language, Arc<Mutex<()>>>>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SledStore>,
    pub metric: Arc<MilneWittenMetric<SledStore>>,
    pub graphs: Graphs,
    pub graphs_dir: PathBuf,
    pub admin_token: Option<String>,
    rebuild_locks: RebuildLocks,
}

impl AppState {
    fn graph(&self, lang: &Language) -> Result<Arc<CategoryGraph>, ApiError> {
        self.graphs
            .read()
            .get(lang)
            .cloned()
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no category graph loaded for {lang}")))
    }
}

/// Opens the page store and loads every persisted graph found one level
/// below `graphs_dir`.
pub fn build_app(store_dir: &FsPath, graphs_dir: &FsPath, admin_token: Option<String>) -> Result<Router> {
    let store = Arc::new(SledStore::open(store_dir)?);
    let metric = Arc::new(MilneWittenMetric::new(Arc::clone(&store)));
    let graphs = load_graphs(graphs_dir)?;
    let app_state = AppState {
        store,
        metric,
        graphs: Arc::new(RwLock::new(graphs)),
        graphs_dir: graphs_dir.to_path_buf(),
        admin_token,
        rebuild_locks: RebuildLocks::default(),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/similarity", get(similarity_handler))
        .route("/most-similar", get(most_similar_handler))
        .route("/categories/:lang/top", get(top_categories_handler))
        .route("/categories/:lang/:page_id", get(category_handler))
        .route("/category-distances", get(distances_handler))
        .route("/category-similarity", get(category_similarity_handler))
        .route("/category-most-similar", get(category_most_similar_handler))
        .route("/graphs/:lang/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn load_graphs(graphs_dir: &FsPath) -> Result<HashMap<Language, Arc<CategoryGraph>>> {
    let mut graphs = HashMap::new();
    if !graphs_dir.is_dir() {
        tracing::warn!(dir = %graphs_dir.display(), "graph directory missing, starting without graphs");
        return Ok(graphs);
    }
    for entry in std::fs::read_dir(graphs_dir)? {
        let paths = GraphPaths::new(entry?.path());
        if !paths.exists() {
            continue;
        }
        let (graph, meta) = persist::load(&paths)?;
        tracing::info!(lang = %meta.language, categories = meta.num_categories, created_at = %meta.created_at, "loaded category graph");
        graphs.insert(meta.language, Arc::new(graph));
    }
    Ok(graphs)
}

fn internal<E: Display>(e: E) -> ApiError {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn finite(result: &SrResult) -> Option<f64> { result.is_valid().then(|| result.score()) }

fn finite_cost(cost: f64) -> Option<f64> { cost.is_finite().then_some(cost) }

pub async fn similarity_handler(State(state): State<AppState>, Query(params): Query<SimilarityParams>) -> ApiResult<SimilarityResponse> {
    let result = if params.combined {
        state.metric.combined_similarity_by_id(&params.lang, params.a, params.b, params.explain)
    } else {
        let direction = LinkDirection::from_out_links(params.out_links);
        state.metric.similarity_by_id(&params.lang, params.a, params.b, direction, params.explain)
    }
    .map_err(internal)?;
    let formatter = ExplanationFormatter::new(state.store.as_ref());
    let mut explanations = Vec::with_capacity(result.explanations().len());
    for e in result.explanations() {
        let text = formatter.format(&params.lang, e).map_err(internal)?;
        explanations.push(ExplanationView { template: e.template, refs: e.refs.clone(), text });
    }
    Ok(Json(SimilarityResponse { score: finite(&result), explanations }))
}

pub async fn most_similar_handler(State(state): State<AppState>, Query(params): Query<MostSimilarParams>) -> ApiResult<Vec<ScoredPage>> {
    let page = state
        .store
        .resolve(&params.lang, params.id)
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no page {} in {}", params.id, params.lang)))?;
    let n = params.n.clamp(1, 100);
    let direction = LinkDirection::from_out_links(params.out_links);
    let results = state.metric.most_similar(&page, direction, n, None).map_err(internal)?;
    let mut out = Vec::with_capacity(results.len());
    for result in results {
        let Some(id) = result.id else { continue };
        let title = state.store.page(&params.lang, id).map_err(internal)?.map(|p| p.title);
        out.push(ScoredPage { id, title, score: finite(&result) });
    }
    Ok(Json(out))
}

pub async fn top_categories_handler(
    State(state): State<AppState>,
    Path(lang): Path<Language>,
    Query(params): Query<TopParams>,
) -> ApiResult<Vec<CategoryView>> {
    let graph = state.graph(&lang)?;
    let top = graph
        .top_categories(params.n)
        .into_iter()
        .map(|(c, cost)| CategoryView { id: graph.category_id(c), name: graph.name(c).to_string(), cost: finite_cost(cost) })
        .collect();
    Ok(Json(top))
}

pub async fn category_handler(State(state): State<AppState>, Path((lang, page_id)): Path<(Language, PageId)>) -> ApiResult<Value> {
    let graph = state.graph(&lang)?;
    let c = graph
        .category_index(page_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("{page_id} is not a category in {lang}")))?;
    let ids = |cs: &[usize]| cs.iter().map(|&p| graph.category_id(p)).collect::<Vec<_>>();
    Ok(Json(json!({
        "id": page_id,
        "name": graph.name(c),
        "cost": finite_cost(graph.cost(c)),
        "useful": graph.is_useful(c),
        "parents": ids(graph.parents(c)),
        "children": ids(graph.children(c)),
        "num_pages": graph.pages(c).len(),
    })))
}

pub async fn distances_handler(State(state): State<AppState>, Query(params): Query<DistanceParams>) -> ApiResult<Vec<Value>> {
    let goals = parse_ids(&params.goals).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let graph = state.graph(&params.lang)?;
    let start = state.store.categories_of(&params.lang, params.id).map_err(internal)?;
    let distances = category_distances(&graph, &start, &goals, params.weighted);
    let mut rows: Vec<(PageId, f64)> = distances.into_iter().collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    let out = rows
        .into_iter()
        .map(|(id, distance)| {
            let name = graph.category_index(id).map(|c| graph.name(c).to_string());
            json!({ "id": id, "name": name, "distance": finite_cost(distance) })
        })
        .collect();
    Ok(Json(out))
}

pub async fn category_similarity_handler(State(state): State<AppState>, Query(params): Query<PairParams>) -> ApiResult<Value> {
    let graph = state.graph(&params.lang)?;
    let categories1 = state.store.categories_of(&params.lang, params.a).map_err(internal)?;
    let categories2 = state.store.categories_of(&params.lang, params.b).map_err(internal)?;
    let score = category_similarity(&graph, &categories1, &categories2);
    Ok(Json(json!({ "score": finite_cost(score) })))
}

pub async fn category_most_similar_handler(
    State(state): State<AppState>,
    Query(params): Query<MostSimilarParams>,
) -> ApiResult<Vec<ScoredPage>> {
    let graph = state.graph(&params.lang)?;
    let start = state.store.categories_of(&params.lang, params.id).map_err(internal)?;
    let n = params.n.clamp(1, 100);
    let mut out = Vec::with_capacity(n);
    for result in category_most_similar(&graph, params.id, &start, n, None) {
        let Some(id) = result.id else { continue };
        let title = state.store.page(&params.lang, id).map_err(internal)?.map(|p| p.title);
        out.push(ScoredPage { id, title, score: finite(&result) });
    }
    Ok(Json(out))
}

fn parse_ids(list: &str) -> Result<HashSet<PageId>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<PageId>().map_err(|_| format!("invalid page id {s:?}")))
        .collect()
}

// --- Admin endpoints ---
async fn rebuild_handler(State(state): State<AppState>, Path(lang): Path<Language>, headers: HeaderMap) -> ApiResult<GraphMeta> {
    authorize(&state, &headers)?;
    let lock = Arc::clone(state.rebuild_locks.lock().entry(lang.clone()).or_default());
    let paths = GraphPaths::new(state.graphs_dir.join(lang.code()));
    let meta = tokio::task::spawn_blocking(move || -> Result<GraphMeta> {
        // One rebuild per language at a time: write and publish in order.
        let _guard = lock.lock();
        let graph = CategoryGraphBuilder::new(state.store.as_ref(), state.store.as_ref()).build(&lang)?;
        let meta = persist::save(&paths, &graph)?;
        // Readers holding the previous Arc keep using it until they finish.
        state.graphs.write().insert(lang, Arc::new(graph));
        Ok(meta)
    })
    .await
    .map_err(internal)?
    .map_err(internal)?;
    tracing::info!(lang = %meta.language, categories = meta.num_categories, "published rebuilt category graph");
    Ok(Json(meta))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
