//! HTTP surface tests: ingest, registration, bootstrap, analysis and health.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::fixtures::{ingest_body, social_payload};
use integration_tests::mocks::Behavior;
use integration_tests::setup::TestContext;
use serde_json::{json, Value};

fn server(ctx: &TestContext) -> TestServer {
    TestServer::new(ctx.router()).expect("Failed to create test server")
}

#[tokio::test]
async fn test_ingest_stores_raw_event() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server.post("/ingest/social").json(&ingest_body("acme", social_payload())).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["domain"], "social");
    assert_eq!(body["payload_hash"].as_str().unwrap().len(), 64);

    let events = ctx.store.raw_events("acme");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].domain, "social");
    assert_eq!(events[0].brand_id, "brand-1");
    assert_eq!(events[0].platform.as_deref(), Some("instagram"));
    assert_eq!(events[0].schema_version, "v1");
    assert_eq!(events[0].payload_hash, body["payload_hash"].as_str().unwrap());
}

#[tokio::test]
async fn test_identical_payloads_hash_identically() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let a = server
        .post("/ingest/crm")
        .json(&ingest_body("acme", json!({"b": 2, "a": 1})))
        .await;
    let b = server
        .post("/ingest/crm")
        .json(&ingest_body("acme", json!({"a": 1, "b": 2})))
        .await;

    a.assert_status_ok();
    b.assert_status_ok();
    assert_eq!(a.json::<Value>()["payload_hash"], b.json::<Value>()["payload_hash"]);
    assert_eq!(ctx.store.raw_events("acme").len(), 2);
}

#[tokio::test]
async fn test_ingest_rejects_unknown_domain() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server.post("/ingest/email").json(&ingest_body("acme", social_payload())).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_003");
    assert!(ctx.store.raw_events("acme").is_empty());
}

#[tokio::test]
async fn test_ingest_rejects_malformed_json() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server.post("/ingest/social").text("{not json").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_001");
}

#[tokio::test]
async fn test_ingest_rejects_missing_fields() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server
        .post("/ingest/social")
        .json(&json!({"tenant_id": "acme", "payload": {"a": 1}}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_001");
}

#[tokio::test]
async fn test_ingest_unknown_tenant_is_not_found() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.post("/ingest/social").json(&ingest_body("ghost", social_payload())).await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "TENANT_002");
}

#[tokio::test]
async fn test_ingest_storage_failure_is_internal_error() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    ctx.store.fail_writes_for("acme");
    let server = server(&ctx);

    let response = server.post("/ingest/ads").json(&ingest_body("acme", social_payload())).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001");
    assert_eq!(body["error"], "Failed to store data");
}

#[tokio::test]
async fn test_bootstrap_registered_tenant() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server.post("/schema/bootstrap").json(&json!({"tenant_id": "acme"})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tenant_id"], "acme");
    assert_eq!(body["schema"], "tenant_acme");
    assert!(ctx.store.is_bootstrapped("acme"));
}

#[tokio::test]
async fn test_bootstrap_unknown_tenant_without_shared_database() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.post("/schema/bootstrap").json(&json!({"tenant_id": "fresh"})).await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(!ctx.store.is_bootstrapped("fresh"));
}

#[tokio::test]
async fn test_bootstrap_provisions_in_shared_database() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router_with_shared_database()).unwrap();

    let response = server.post("/schema/bootstrap").json(&json!({"tenant_id": "fresh"})).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["schema"], "tenant_fresh");
    assert!(ctx.store.is_bootstrapped("fresh"));
}

#[tokio::test]
async fn test_bootstrap_rejects_unsafe_tenant_id() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router_with_shared_database()).unwrap();

    let response = server
        .post("/schema/bootstrap")
        .json(&json!({"tenant_id": "acme; DROP SCHEMA public"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_002");
}

fn registration(org_name: &str) -> Value {
    json!({
        "org_name": org_name,
        "host": "tenant-db.internal",
        "db_name": "analytics",
        "user": "svc",
        "password": "s3cret"
    })
}

#[tokio::test]
async fn test_register_then_bootstrap_and_ingest() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.post("/tenant/register").json(&registration("Acme Corp")).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tenant_id"], "acme_corp");
    assert_eq!(body["schema"], "tenant_acme_corp");
    assert!(body.get("password").is_none());

    let registered = ctx.store.registered("acme_corp").unwrap();
    assert_eq!(registered.coordinates.host, "tenant-db.internal");
    assert_eq!(registered.coordinates.port, 5432);
    assert_eq!(registered.coordinates.password, "s3cret");

    server
        .post("/schema/bootstrap")
        .json(&json!({"tenant_id": "acme_corp"}))
        .await
        .assert_status_ok();
    server
        .post("/ingest/social")
        .json(&ingest_body("acme_corp", social_payload()))
        .await
        .assert_status_ok();
    assert_eq!(ctx.store.raw_events("acme_corp").len(), 1);
}

#[tokio::test]
async fn test_reregistering_updates_connection_details() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    server.post("/tenant/register").json(&registration("Acme Corp")).await.assert_status_ok();
    let mut moved = registration("Acme Corp");
    moved["host"] = json!("replica.internal");
    moved["port"] = json!(6432);
    server.post("/tenant/register").json(&moved).await.assert_status_ok();

    let registered = ctx.store.registered("acme_corp").unwrap();
    assert_eq!(registered.coordinates.host, "replica.internal");
    assert_eq!(registered.coordinates.port, 6432);
}

#[tokio::test]
async fn test_register_rejects_short_org_name() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.post("/tenant/register").json(&registration("ab")).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_001");
    assert!(ctx.store.registered("ab").is_none());
}

#[tokio::test]
async fn test_register_storage_failure_is_internal_error() {
    let ctx = TestContext::new();
    ctx.store.fail_writes_for("acme_corp");
    let server = server(&ctx);

    let response = server.post("/tenant/register").json(&registration("Acme Corp")).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], "DB_001");
    assert!(ctx.store.registered("acme_corp").is_none());
}

fn analysis_body() -> Value {
    json!({"payload": {"instagram": {"followers": 1200, "engagement_rate": 0.042}}})
}

#[tokio::test]
async fn test_analysis_stores_combined_summary() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&analysis_body())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["created_at"].as_str().unwrap().contains('T'));

    let stored = ctx.store.embeddings("acme");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].post_id, body["post_id"].as_str().unwrap());
    let text = stored[0].payload["combined_text"].as_str().unwrap();
    assert!(text.starts_with(&format!("Date: {}", body["created_at"].as_str().unwrap())));
    assert!(text.contains("\n\nSummary 1:\nDigest: Create a detailed\n\nSummary 2:\nDigest: Summarize the provided\n\n"));
    assert!(text.ends_with("Original Content Context: Summary of input."));
    assert_eq!(stored[0].embedding, vec![text.len() as f32, 1.0, 0.5]);

    let calls = ctx.model.payload_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, payload)| payload.contains("\"followers\":1200")));
    assert_eq!(ctx.model.embed_calls(), 1);
}

#[tokio::test]
async fn test_analysis_requires_tenant_header() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server.post("/analysis/summarize").json(&analysis_body()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALID_001");
    assert!(ctx.model.payload_calls().is_empty());
}

#[tokio::test]
async fn test_analysis_rejects_scalar_payload() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&json!({"payload": 42}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(ctx.store.embeddings("acme").is_empty());
}

#[tokio::test]
async fn test_analysis_unknown_tenant_is_not_found() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "ghost")
        .json(&analysis_body())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "TENANT_002");
    assert!(ctx.model.payload_calls().is_empty());
}

#[tokio::test]
async fn test_analysis_model_failure_stores_nothing() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    ctx.model.set_payload_behavior(Behavior::Fail);
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&analysis_body())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(response.json::<Value>()["code"], "LLM_001");
    assert!(ctx.store.embeddings("acme").is_empty());
    assert_eq!(ctx.model.embed_calls(), 0);
}

#[tokio::test]
async fn test_analysis_embedding_failure_stores_nothing() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    ctx.model.set_embed_behavior(Behavior::Fail);
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&analysis_body())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(ctx.store.embeddings("acme").is_empty());
}

#[tokio::test]
async fn test_analysis_without_model_is_unavailable() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    let server = TestServer::new(ctx.router_without_model()).unwrap();

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&analysis_body())
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "LLM_001");
}

#[tokio::test]
async fn test_analysis_storage_failure_is_internal_error() {
    let ctx = TestContext::new();
    ctx.add_tenant("acme");
    ctx.store.fail_writes_for("acme");
    let server = server(&ctx);

    let response = server
        .post("/analysis/summarize")
        .add_header("X-Tenant-Id", "acme")
        .json(&analysis_body())
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], "DB_001");
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["status"].is_string());
    assert!(body["master_db_connected"].is_boolean());
    assert!(body["llm_available"].is_boolean());
    assert!(body["open_pools"].is_u64());
    let components: Vec<&str> = body["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(components, vec!["master_db", "llm"]);

    server.get("/health/live").await.assert_status_ok();

    telemetry::health().master_db.set_healthy();
    server.get("/health/ready").await.assert_status_ok();
}
