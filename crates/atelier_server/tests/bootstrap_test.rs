//! Wiring a server from configuration.

mod test_utils;

use atelier_rate_limit::AtelierConfig;
use atelier_server::{
    AppState, ErrorBody, StoreBackend, build_admission, build_orchestrator, build_uploader,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::serve;

fn config_with_root(root: &std::path::Path) -> AtelierConfig {
    let overrides = format!(
        r#"
[upload]
root = "{}"

[providers.image]
api_key_env = "ATELIER_TEST_UNSET_IMAGE_KEY"

[providers.video]
api_key_env = "ATELIER_TEST_UNSET_VIDEO_KEY"
"#,
        root.display()
    );
    AtelierConfig::from_toml_str(&overrides).unwrap()
}

#[tokio::test]
async fn providers_without_keys_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_root(&dir.path().join("cdn"));

    let (uploader, cdn) = build_uploader(&config).unwrap();
    assert!(dir.path().join("cdn").is_dir());
    let admission = build_admission(&config).unwrap();
    let orchestrator =
        build_orchestrator(&config, &StoreBackend::Memory, uploader, admission).unwrap();
    let base = serve(AppState::new(Arc::new(orchestrator)).with_cdn(cdn)).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/generations/image", base))
        .header("x-user-id", "alice")
        .json(&json!({"prompt": "a castle on a hill"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.kind.as_deref(), Some("generation"));
}

#[tokio::test]
async fn unassigned_users_get_the_default_plan() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_root(dir.path());

    let (uploader, _) = build_uploader(&config).unwrap();
    let admission = build_admission(&config).unwrap();
    let orchestrator =
        build_orchestrator(&config, &StoreBackend::Memory, uploader, admission).unwrap();
    let base = serve(AppState::new(Arc::new(orchestrator))).await;

    let report: Value = reqwest::Client::new()
        .get(format!("{}/quota", base))
        .header("x-user-id", "newcomer")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["plan"]["name"], config.default_plan.as_str());
    assert_eq!(report["usage"]["nutsUsed"], 0);
}
