//! Shared fixtures for integration tests: a fake Shopify store and
//! throwaway git repositories.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Catalogue served by one fake store
#[derive(Debug, Clone, Default)]
pub struct FakeCatalogue {
    pub products: Vec<Value>,
    /// Page number that answers with HTTP 500
    pub fail_on_page: Option<u32>,
}

#[derive(Default)]
struct ShopState {
    stores: HashMap<String, FakeCatalogue>,
    requests: Mutex<Vec<(String, u32, u32)>>,
}

/// A running fake Shopify host serving `/<store>/products.json`
pub struct FakeShop {
    pub base_url: String,
    state: Arc<ShopState>,
}

impl FakeShop {
    pub fn endpoint(&self, store: &str) -> String {
        format!("{}/{}/products.json", self.base_url, store)
    }

    /// `(store, limit, page)` of every request served so far
    pub fn requests(&self) -> Vec<(String, u32, u32)> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stores file content pointing every fake store at this server
    pub fn stores_toml(&self) -> String {
        let mut names: Vec<&String> = self.state.stores.keys().collect();
        names.sort();
        let mut toml = String::from("[stores]\n");
        for name in names {
            toml.push_str(&format!("{} = \"{}\"\n", name, self.endpoint(name)));
        }
        toml
    }
}

async fn products(
    State(state): State<Arc<ShopState>>,
    axum::extract::Path(store): axum::extract::Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let limit: u32 = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(30);
    let page: u32 = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    state
        .requests
        .lock()
        .unwrap()
        .push((store.clone(), limit, page));

    let Some(catalogue) = state.stores.get(&store) else {
        return (StatusCode::NOT_FOUND, "no such store").into_response();
    };
    if catalogue.fail_on_page == Some(page) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let start = ((page.max(1) - 1) * limit) as usize;
    let items: Vec<Value> = catalogue
        .products
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    Json(json!({ "products": items })).into_response()
}

pub async fn start_shop(stores: HashMap<String, FakeCatalogue>) -> FakeShop {
    let state = Arc::new(ShopState {
        stores,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/:store/products.json", get(products))
        .with_state(state.clone());

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("fake shop error: {}", e);
        }
    });

    FakeShop {
        base_url: format!("http://{}:{}", addr.ip(), addr.port()),
        state,
    }
}

/// `count` products named `<prefix> N`
pub fn products_named(prefix: &str, count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| {
            json!({
                "id": i,
                "title": format!("{} {}", prefix, i),
                "vendor": prefix,
                "product_type": "3x3",
                "tags": ["magnetic"],
                "variants": [{"title": "Stickerless", "grams": 60, "available": true}]
            })
        })
        .collect()
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git must be installed for integration tests");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initializes a repository with one commit so `HEAD` exists.
pub fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    std::fs::write(dir.join("README.md"), "catalogues\n").unwrap();
    git(dir, &["add", "README.md"]);
    git(
        dir,
        &[
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "commit",
            "--quiet",
            "-m",
            "init",
        ],
    );
}

pub fn commit_count(dir: &Path) -> usize {
    git(dir, &["rev-list", "--count", "HEAD"]).parse().unwrap()
}
