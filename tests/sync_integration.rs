//! End-to-end sync runs: fake stores, real git repositories

mod support;

use cubeindex::pipeline::{SlotStatus, SyncContext, SyncOptions, SyncOrchestrator, SyncReport};
use cubeindex::publish::{CommitIdentity, CommitPublisher, GitRepo, PublishOutcome};
use cubeindex::registry::{StoreId, StoreRegistry};
use cubeindex::scraper::NativeScraper;
use cubeindex::CubeIndexConfig;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use support::{commit_count, git, init_repo, products_named, start_shop, FakeCatalogue, FakeShop};
use tempfile::TempDir;

const BOT_NAME: &str = "github-actions[bot]";
const BOT_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

fn catalogue(prefix: &str, count: usize) -> FakeCatalogue {
    FakeCatalogue {
        products: products_named(prefix, count),
        ..Default::default()
    }
}

async fn shop(scs: usize, kewbz: usize) -> FakeShop {
    let mut stores = HashMap::new();
    stores.insert("scs".to_string(), catalogue("RS3M", scs));
    stores.insert("kewbz".to_string(), catalogue("Valk", kewbz));
    start_shop(stores).await
}

fn matrix(ids: &[&str]) -> Vec<StoreId> {
    ids.iter().map(|id| StoreId::parse(id).unwrap()).collect()
}

async fn publisher(repo_dir: &Path) -> CommitPublisher {
    let repo = GitRepo::open(repo_dir).await.unwrap();
    let identity = CommitIdentity {
        name: BOT_NAME.to_string(),
        email: BOT_EMAIL.to_string(),
    };
    CommitPublisher::new(repo, identity, "Update store catalogues ({stores})")
}

async fn run_sync(shop: &FakeShop, stores: &[&str], repo_dir: &Path, staging: &Path, commit_partial: bool) -> SyncReport {
    let registry = StoreRegistry::from_toml_str(&shop.stores_toml()).unwrap();
    let config = CubeIndexConfig {
        page_limit: 2,
        page_delay_ms: 0,
        ..CubeIndexConfig::default()
    };
    let scraper = NativeScraper::new(Arc::new(registry), &config);

    let options = SyncOptions {
        data_dir: repo_dir.join("stores_products"),
        max_parallel: 0,
        fail_fast: false,
        commit_partial,
    };
    let mut context = SyncContext::new(matrix(stores), Arc::new(scraper), staging.to_path_buf(), options)
        .with_publisher(Some(publisher(repo_dir).await));

    SyncOrchestrator::new().execute(&mut context).await.unwrap()
}

#[tokio::test]
async fn test_changed_catalogues_produce_exactly_one_bot_commit() {
    let repo = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    init_repo(repo.path());
    let shop = shop(3, 5).await;

    let report = run_sync(&shop, &["scs", "kewbz"], repo.path(), staging.path(), false).await;

    assert!(report.is_success());
    assert_eq!(report.aggregated.len(), 2);
    match report.publish {
        Some(PublishOutcome::Committed { ref files, .. }) => {
            assert_eq!(
                files,
                &vec![
                    "stores_products/kewbz_products.json".to_string(),
                    "stores_products/scs_products.json".to_string(),
                ]
            );
        }
        ref other => panic!("expected a commit, got {:?}", other),
    }

    assert_eq!(commit_count(repo.path()), 2);
    let author = git(repo.path(), &["log", "-1", "--format=%an <%ae>"]);
    assert_eq!(author, format!("{} <{}>", BOT_NAME, BOT_EMAIL));
    let message = git(repo.path(), &["log", "-1", "--format=%s"]);
    assert_eq!(message, "Update store catalogues (kewbz, scs)");

    let written = std::fs::read_to_string(repo.path().join("stores_products/kewbz_products.json")).unwrap();
    let products: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
    assert_eq!(products.len(), 5);
}

#[tokio::test]
async fn test_identical_catalogues_do_not_commit() {
    let repo = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    init_repo(repo.path());
    let shop = shop(3, 5).await;

    run_sync(&shop, &["scs", "kewbz"], repo.path(), staging.path(), false).await;
    assert_eq!(commit_count(repo.path()), 2);

    let report = run_sync(&shop, &["scs", "kewbz"], repo.path(), staging.path(), false).await;

    assert_eq!(report.publish, Some(PublishOutcome::Unchanged));
    assert_eq!(commit_count(repo.path()), 2);
}

#[tokio::test]
async fn test_only_changed_files_are_in_the_new_commit() {
    let repo = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    init_repo(repo.path());

    run_sync(&shop(3, 5).await, &["scs", "kewbz"], repo.path(), staging.path(), false).await;
    let report = run_sync(&shop(3, 6).await, &["scs", "kewbz"], repo.path(), staging.path(), false).await;

    match report.publish {
        Some(PublishOutcome::Committed { ref files, .. }) => {
            assert_eq!(files, &vec!["stores_products/kewbz_products.json".to_string()]);
        }
        ref other => panic!("expected a commit, got {:?}", other),
    }
    assert_eq!(commit_count(repo.path()), 3);
    let changed = git(repo.path(), &["show", "--name-only", "--format=", "HEAD"]);
    assert_eq!(changed, "stores_products/kewbz_products.json");
}

#[tokio::test]
async fn test_failed_slot_blocks_aggregation_and_commit() {
    let repo = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    init_repo(repo.path());
    let shop = shop(3, 5).await;

    let report = run_sync(&shop, &["scs", "d-fan"], repo.path(), staging.path(), false).await;

    assert!(!report.is_success());
    assert!(report.slots[0].succeeded());
    match &report.slots[1].status {
        SlotStatus::Failed { error } => assert!(error.contains("d-fan")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.aggregation_skipped.is_some());
    assert!(report.publish.is_none());
    assert!(!repo.path().join("stores_products").exists());
    assert_eq!(commit_count(repo.path()), 1);
}

#[tokio::test]
async fn test_commit_partial_publishes_successful_slots() {
    let repo = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    init_repo(repo.path());
    let shop = shop(3, 5).await;

    let report = run_sync(&shop, &["scs", "d-fan"], repo.path(), staging.path(), true).await;

    assert_eq!(report.failed_slots(), 1);
    assert!(matches!(report.publish, Some(PublishOutcome::Committed { .. })));
    assert!(repo.path().join("stores_products/scs_products.json").exists());
    assert!(!repo.path().join("stores_products/d-fan_products.json").exists());
}

#[tokio::test]
async fn test_unrelated_staged_files_stay_out_of_the_commit() {
    let repo = TempDir::new().unwrap();
    init_repo(repo.path());
    std::fs::create_dir_all(repo.path().join("stores_products")).unwrap();
    std::fs::write(repo.path().join("stores_products/scs_products.json"), "[]").unwrap();
    std::fs::write(repo.path().join("notes.txt"), "work in progress").unwrap();
    git(repo.path(), &["add", "notes.txt"]);

    let outcome = publisher(repo.path())
        .await
        .publish(&repo.path().join("stores_products"))
        .await
        .unwrap();

    assert!(matches!(outcome, PublishOutcome::Committed { .. }));
    let still_staged = git(repo.path(), &["diff", "--cached", "--name-only"]);
    assert_eq!(still_staged, "notes.txt");
}
