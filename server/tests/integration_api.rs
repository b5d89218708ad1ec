use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;
use wikirel_core::persist::{self, GraphPaths};
use wikirel_core::store::SledStore;
use wikirel_core::{CategoryGraphBuilder, CategoryMember, Language, LocalPage, NameSpace};

fn en() -> Language { "en".parse().unwrap() }

/// Dog(1) and Cat(2) share out-links to Mammal(3) and Pet(4); Rock(5) links
/// to Pet only. Categories: Animals(100) <- Carnivores(101) <- {Dog, Cat}.
fn build_tiny_store(store_dir: &Path, graphs_dir: Option<&Path>) {
    let store = SledStore::open(store_dir).unwrap();
    let lang = en();
    for (id, title) in [(1, "Dog"), (2, "Cat"), (3, "Mammal"), (4, "Pet"), (5, "Rock")] {
        store.put_page(&LocalPage::new(lang.clone(), id, title, NameSpace::Article)).unwrap();
    }
    store.put_page(&LocalPage::new(lang.clone(), 100, "Category:Animals", NameSpace::Category)).unwrap();
    store.put_page(&LocalPage::new(lang.clone(), 101, "Category:Carnivores", NameSpace::Category)).unwrap();
    for (src, dst) in [(1, 3), (1, 4), (2, 3), (2, 4), (5, 4)] {
        store.put_link(&lang, src, dst).unwrap();
    }
    for (member_id, category_id) in [(1, 101), (2, 101), (101, 100)] {
        store.put_membership(&lang, CategoryMember { member_id, category_id }).unwrap();
    }
    store.flush().unwrap();
    if let Some(graphs_dir) = graphs_dir {
        let graph = CategoryGraphBuilder::new(&store, &store).build(&lang).unwrap();
        persist::save(&GraphPaths::new(graphs_dir.join("en")), &graph).unwrap();
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = tower::ServiceExt::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn similarity_scores_and_explains() {
    let store = tempdir().unwrap();
    let graphs = tempdir().unwrap();
    build_tiny_store(store.path(), None);
    let app = server::build_app(store.path(), graphs.path(), None).unwrap();

    let (status, json) = get(app.clone(), "/similarity?lang=en&a=1&b=2&out_links=true&explain=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"].as_f64(), Some(1.0));
    let texts: Vec<&str> = json["explanations"].as_array().unwrap().iter().map(|e| e["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["Both Dog and Cat link to Mammal", "Both Dog and Cat link to Pet"]);
    assert_eq!(json["explanations"][0]["template"], "both_link_to");

    // In-links share nothing (0.0), out-links are identical (1.0).
    let (status, json) = get(app.clone(), "/similarity?lang=en&a=1&b=2&combined=true&explain=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"].as_f64(), Some(0.5));
    assert_eq!(json["explanations"].as_array().unwrap().len(), 2);

    // Missing pages have no defined score.
    let (status, json) = get(app, "/similarity?lang=en&a=1&b=999").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["score"].is_null());
}

#[tokio::test]
async fn most_similar_lists_candidates() {
    let store = tempdir().unwrap();
    let graphs = tempdir().unwrap();
    build_tiny_store(store.path(), None);
    let app = server::build_app(store.path(), graphs.path(), None).unwrap();

    let (status, json) = get(app.clone(), "/most-similar?lang=en&id=1&out_links=true").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = json.as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 5]);
    assert_eq!(json[0]["title"], "Cat");

    let (status, _) = get(app, "/most-similar?lang=en&id=999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serves_persisted_category_graphs() {
    let store = tempdir().unwrap();
    let graphs = tempdir().unwrap();
    build_tiny_store(store.path(), Some(graphs.path()));
    let app = server::build_app(store.path(), graphs.path(), None).unwrap();

    let (status, json) = get(app.clone(), "/categories/en/top?n=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["id"], 100);

    let (status, json) = get(app.clone(), "/categories/en/101").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Category:Carnivores");
    assert_eq!(json["parents"], serde_json::json!([100]));
    assert_eq!(json["num_pages"], 2);

    let (status, json) = get(app.clone(), "/category-distances?lang=en&id=1&goals=100,101").await;
    assert_eq!(status, StatusCode::OK);
    // Carnivores is a goal, so the walk stops there.
    assert_eq!(json, serde_json::json!([{ "id": 101, "name": "Category:Carnivores", "distance": 1.0 }]));

    // Dog and Cat share Carnivores, the cheapest category.
    let (status, json) = get(app.clone(), "/category-similarity?lang=en&a=1&b=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["score"].as_f64(), Some(1.0));
    let (_, json) = get(app.clone(), "/category-similarity?lang=en&a=1&b=5").await;
    assert_eq!(json["score"].as_f64(), Some(0.0));

    let (status, json) = get(app.clone(), "/category-most-similar?lang=en&id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([{ "id": 2, "title": "Cat", "score": 1.0 }]));

    let (status, _) = get(app.clone(), "/category-distances?lang=en&id=1&goals=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app, "/categories/de/top").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rebuild_requires_the_admin_token() {
    let store = tempdir().unwrap();
    let graphs = tempdir().unwrap();
    build_tiny_store(store.path(), None);
    let app = server::build_app(store.path(), graphs.path(), Some("secret".into())).unwrap();

    let (status, _) = get(app.clone(), "/categories/en/101").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let unauthorized = Request::post("/graphs/en/rebuild").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/graphs/en/rebuild").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_categories"], 2);
    assert!(GraphPaths::new(graphs.path().join("en")).exists());

    let (status, json) = get(app, "/categories/en/101").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["children"], serde_json::json!([]));
}

#[tokio::test]
async fn concurrent_rebuilds_of_one_language_both_complete() {
    let store = tempdir().unwrap();
    let graphs = tempdir().unwrap();
    build_tiny_store(store.path(), None);
    let app = server::build_app(store.path(), graphs.path(), Some("secret".into())).unwrap();

    let rebuild = || Request::post("/graphs/en/rebuild").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let ((s1, j1), (s2, j2)) = tokio::join!(send(app.clone(), rebuild()), send(app.clone(), rebuild()));
    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    assert_eq!(j1["num_categories"], j2["num_categories"]);

    let (graph, meta) = persist::load(&GraphPaths::new(graphs.path().join("en"))).unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(meta.num_edges, 3);
}
