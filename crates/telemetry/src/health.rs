//! Dependency health for the workers and the API.
//!
//! The master database decides whether the process can do anything at all;
//! the language model only decides whether results are real or fallbacks.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Overall process status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but capability calls are falling back
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ComponentState {
    /// `None` until the first check or call
    healthy: Option<bool>,
    consecutive_failures: u32,
    last_error: Option<String>,
    changed_at: Option<DateTime<Utc>>,
}

/// Health of one external dependency, updated by whoever last talked to it.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<ComponentState>,
}

impl ComponentHealth {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(ComponentState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_healthy(&self) {
        let mut state = self.state.write();
        if state.healthy != Some(true) {
            state.changed_at = Some(Utc::now());
        }
        state.healthy = Some(true);
        state.consecutive_failures = 0;
        state.last_error = None;
    }

    pub fn set_unhealthy(&self, error: impl Into<String>) {
        let mut state = self.state.write();
        if state.healthy != Some(false) {
            state.changed_at = Some(Utc::now());
        }
        state.healthy = Some(false);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_error = Some(error.into());
    }

    /// Updates from the outcome of one call.
    pub fn observe<T, E: Display>(&self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.set_healthy(),
            Err(e) => self.set_unhealthy(e.to_string()),
        }
    }

    /// True only after a successful check or call.
    pub fn is_healthy(&self) -> bool {
        self.state.read().healthy == Some(true)
    }

    /// True after a failure that has not been followed by a success.
    pub fn is_failing(&self) -> bool {
        self.state.read().healthy == Some(false)
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn report(&self) -> ComponentHealthReport {
        let state = self.state.read();
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: state.healthy,
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_error.clone(),
            changed_at: state.changed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    /// `null` when the component has not been exercised yet
    pub healthy: Option<bool>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

/// Health of the process's external dependencies.
pub struct HealthRegistry {
    /// Master registry database.
    pub master_db: ComponentHealth,
    /// Language-model capability provider.
    pub llm: ComponentHealth,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            master_db: ComponentHealth::new("master_db"),
            llm: ComponentHealth::new("llm"),
        }
    }

    /// Unhealthy without the master database; degraded while capability
    /// calls fail.
    pub fn status(&self) -> HealthStatus {
        if !self.master_db.is_healthy() {
            HealthStatus::Unhealthy
        } else if self.llm.is_failing() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            components: vec![self.master_db.report(), self.llm.report()],
        }
    }

    /// The API can serve once the master registry is reachable.
    pub fn is_ready(&self) -> bool {
        self.master_db.is_healthy()
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> = std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
