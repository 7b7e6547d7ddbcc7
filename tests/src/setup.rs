//! Common test setup functions.

use std::sync::Arc;

use api::{router, AppState};
use axum::Router;
use insight_core::TenantRecord;
use llm_client::LanguageModel;
use tenant_store::{TenantConnector, TenantDirectory, TenantWriter};
use worker::{SentimentWorker, SummaryWorker, WorkerConfig, WorkerScheduler};

use crate::fixtures::{memory_coordinates, test_worker_config};
use crate::mocks::{MemoryStore, MockLanguageModel};

/// Test context wired entirely in memory.
///
/// The router, the sentiment worker and the summary worker are the
/// production types; only the store and the language model are mocks.
pub struct TestContext {
    pub store: MemoryStore,
    pub model: Arc<MockLanguageModel>,
    pub config: WorkerConfig,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_model(MockLanguageModel::new())
    }

    pub fn with_model(model: MockLanguageModel) -> Self {
        telemetry::init_test_tracing();
        Self {
            store: MemoryStore::new(),
            model: Arc::new(model),
            config: test_worker_config(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_tenant(&self, tenant_id: &str) -> TenantRecord {
        self.store.add_tenant(tenant_id)
    }

    pub fn sentiment_worker(&self) -> SentimentWorker {
        SentimentWorker::new(
            self.directory(),
            self.connector(),
            self.model.clone() as Arc<dyn LanguageModel>,
            self.config.clone(),
        )
    }

    pub fn summary_worker(&self) -> SummaryWorker {
        SummaryWorker::new(
            self.directory(),
            self.connector(),
            self.model.clone() as Arc<dyn LanguageModel>,
            self.config.clone(),
        )
    }

    /// Both workers plus their triggers, as the binary runs them.
    pub fn scheduler(&self) -> WorkerScheduler {
        WorkerScheduler::new(
            self.config.clone(),
            self.directory(),
            self.connector(),
            self.model.clone() as Arc<dyn LanguageModel>,
        )
    }

    /// Router backed by the registry directory only.
    pub fn router(&self) -> Router {
        router(self.app_state())
    }

    /// Router with no language model, as when the provider is not wired.
    pub fn router_without_model(&self) -> Router {
        router(AppState::new(
            self.directory(),
            Arc::new(self.store.clone()) as Arc<dyn TenantWriter>,
        ))
    }

    /// Router that may provision unregistered tenants in a shared database.
    pub fn router_with_shared_database(&self) -> Router {
        router(self.app_state().with_shared_database(memory_coordinates()))
    }

    fn app_state(&self) -> AppState {
        AppState::new(
            self.directory(),
            Arc::new(self.store.clone()) as Arc<dyn TenantWriter>,
        )
        .with_model(self.model.clone() as Arc<dyn LanguageModel>)
    }

    fn directory(&self) -> Arc<dyn TenantDirectory> {
        Arc::new(self.store.clone())
    }

    fn connector(&self) -> Arc<dyn TenantConnector> {
        Arc::new(self.store.clone())
    }
}
