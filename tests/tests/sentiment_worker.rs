//! Sentiment worker tests against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use insight_core::{Classification, Sentiment, SentimentResult};
use integration_tests::fixtures::{interaction, interactions, test_worker_config};
use integration_tests::mocks::MockLanguageModel;
use integration_tests::setup::TestContext;
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_classifies_only_unclassified_interactions() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    ctx.store.add_interaction("t1", interaction("a", "great product"));
    ctx.store.add_interaction("t1", interaction("b", "terrible support"));
    ctx.store.add_interaction("t1", interaction("c", "it arrived"));
    ctx.store.add_sentiment(
        "t1",
        SentimentResult::from_classification("a", Classification::new(Sentiment::Positive, None, 0.8), "old"),
    );
    ctx.model.script(
        "terrible support",
        Classification::new(Sentiment::Negative, Some("anger".into()), 0.95),
    );

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.tenants, 1);
    assert_eq!(report.failed_tenants, 0);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.inserted, 2);

    let mut calls = ctx.model.classify_calls();
    calls.sort();
    assert_eq!(calls, vec!["it arrived", "terrible support"]);

    let rows = ctx.store.sentiments("t1");
    assert_eq!(rows.len(), 3);
    let b = rows.iter().find(|r| r.interaction_id == "b").unwrap();
    assert_eq!(b.sentiment, Sentiment::Negative);
    assert_eq!(b.emotion.as_deref(), Some("anger"));
    assert_eq!(b.model_version, MockLanguageModel::VERSION);

    let a = rows.iter().find(|r| r.interaction_id == "a").unwrap();
    assert_eq!(a.model_version, "old");
    assert_eq!(ctx.store.commits("t1"), 1);
}

#[tokio::test]
async fn test_second_cycle_is_a_no_op() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    for raw in interactions("p", 4) {
        ctx.store.add_interaction("t1", raw);
    }
    let worker = ctx.sentiment_worker();

    let first = worker.run_cycle().await;
    let second = worker.run_cycle().await;

    assert_eq!(first.inserted, 4);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.inserted, 0);
    assert_eq!(ctx.model.classify_calls().len(), 4);
    assert_eq!(ctx.store.sentiments("t1").len(), 4);
    assert_eq!(ctx.store.commits("t1"), 1);
}

#[tokio::test]
async fn test_empty_tenant_commits_nothing() {
    let ctx = TestContext::new();
    ctx.add_tenant("quiet");

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.tenants, 1);
    assert_eq!(report.fetched, 0);
    assert_eq!(ctx.store.commits("quiet"), 0);
    assert!(ctx.model.classify_calls().is_empty());
}

#[tokio::test]
async fn test_batch_size_limits_each_cycle() {
    let mut config = test_worker_config();
    config.batch_size = 3;
    let ctx = TestContext::new().with_config(config);
    ctx.add_tenant("t1");
    for raw in interactions("p", 7) {
        ctx.store.add_interaction("t1", raw);
    }
    let worker = ctx.sentiment_worker();

    assert_eq!(worker.run_cycle().await.inserted, 3);
    assert_eq!(worker.run_cycle().await.inserted, 3);
    assert_eq!(worker.run_cycle().await.inserted, 1);
    assert_eq!(ctx.store.sentiments("t1").len(), 7);
}

#[tokio::test]
async fn test_interactions_without_text_are_ignored() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    ctx.store.add_interaction("t1", json!({"interaction_id": "no-text", "likes": 3}));
    ctx.store.add_interaction("t1", json!({"interaction_id": "caption", "caption": "sunset"}));

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.fetched, 1);
    assert_eq!(ctx.model.classify_calls(), vec!["sunset"]);
}

#[tokio::test]
async fn test_classification_failure_stores_neutral_fallback() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    ctx.store.add_interaction("t1", interaction("ok", "fine"));
    ctx.store.add_interaction("t1", interaction("bad", "unparseable"));
    ctx.model.fail_classify_on("unparseable");

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.inserted, 2);
    assert_eq!(report.fallbacks, 1);

    let rows = ctx.store.sentiments("t1");
    let bad = rows.iter().find(|r| r.interaction_id == "bad").unwrap();
    assert_eq!(bad.sentiment, Sentiment::Neutral);
    assert_eq!(bad.emotion, None);
    assert_eq!(bad.confidence, 0.0);
    assert_eq!(bad.model_version, MockLanguageModel::VERSION);
}

#[tokio::test]
async fn test_slow_capability_times_out_to_fallback() {
    let mut config = test_worker_config();
    config.capability_timeout = Duration::from_millis(20);
    let ctx = TestContext::with_model(MockLanguageModel::new().with_delay(Duration::from_millis(500)))
        .with_config(config);
    ctx.add_tenant("t1");
    for raw in interactions("slow", 3) {
        ctx.store.add_interaction("t1", raw);
    }

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.inserted, 3);
    assert_eq!(report.fallbacks, 3);
    assert!(ctx
        .store
        .sentiments("t1")
        .iter()
        .all(|r| r.sentiment == Sentiment::Neutral && r.confidence == 0.0));
}

#[tokio::test]
async fn test_tenant_failure_does_not_affect_others() {
    let ctx = TestContext::new();
    for tenant in ["a", "b", "c"] {
        ctx.add_tenant(tenant);
        ctx.store.add_interaction(tenant, interaction(&format!("{}-1", tenant), "hello"));
    }
    ctx.store.fail_writes_for("b");
    ctx.store.fail_open_for("c");

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.tenants, 3);
    assert_eq!(report.failed_tenants, 2);
    assert_eq!(ctx.store.sentiments("a").len(), 1);
    assert!(ctx.store.sentiments("b").is_empty());
    assert_eq!(ctx.store.commits("b"), 0);
    assert_eq!(ctx.store.rollbacks("b"), 1);
    assert!(ctx.store.sentiments("c").is_empty());
}

#[tokio::test]
async fn test_enumeration_failure_skips_cycle() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    ctx.store.add_interaction("t1", interaction("x", "hi"));
    ctx.store.set_enumeration_failure(true);

    let worker = ctx.sentiment_worker();
    let report = worker.run_cycle().await;

    assert_eq!(report.tenants, 0);
    assert_eq!(ctx.store.max_open_sessions(), 0);
    assert!(ctx.model.classify_calls().is_empty());

    ctx.store.set_enumeration_failure(false);
    assert_eq!(worker.run_cycle().await.inserted, 1);
}

#[tokio::test]
async fn test_tenant_concurrency_is_bounded_by_chunk_size() {
    let mut config = test_worker_config();
    config.max_concurrent_tenants = 3;
    let ctx = TestContext::with_model(MockLanguageModel::new().with_delay(Duration::from_millis(30)))
        .with_config(config);
    for i in 0..10 {
        let tenant = format!("tenant{}", i);
        ctx.add_tenant(&tenant);
        ctx.store.add_interaction(&tenant, interaction(&format!("{}-1", tenant), "hi"));
    }

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.tenants, 10);
    assert_eq!(report.inserted, 10);
    assert!(ctx.store.max_open_sessions() <= 3);
    assert!(ctx.store.max_open_sessions() >= 2);
}

#[tokio::test]
async fn test_capability_calls_are_bounded_across_tenants() {
    let mut config = test_worker_config();
    config.max_concurrent_requests = 4;
    let ctx = TestContext::with_model(MockLanguageModel::new().with_delay(Duration::from_millis(20)))
        .with_config(config);
    for tenant in ["a", "b"] {
        ctx.add_tenant(tenant);
        for raw in interactions(tenant, 10) {
            ctx.store.add_interaction(tenant, raw);
        }
    }

    let report = ctx.sentiment_worker().run_cycle().await;

    assert_eq!(report.inserted, 20);
    assert!(ctx.model.max_in_flight() <= 4);
    assert!(ctx.model.max_in_flight() >= 2);
}

#[tokio::test]
async fn test_run_loop_picks_up_new_work_and_stops_on_cancel() {
    let ctx = TestContext::new();
    ctx.add_tenant("t1");
    ctx.store.add_interaction("t1", interaction("first", "one"));

    let worker = Arc::new(ctx.sentiment_worker());
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));

    wait_until(|| ctx.store.sentiments("t1").len() == 1).await;
    ctx.store.add_interaction("t1", interaction("second", "two"));
    wait_until(|| ctx.store.sentiments("t1").len() == 2).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker did not stop after cancellation")
        .unwrap();
}

async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
