//! Tenant data access for InsightIQ.
//!
//! - [`PoolRegistry`]: one shared pool per physical database
//! - [`TenantConnector`] / [`TenantSession`]: schema-scoped transactions
//! - [`TenantDirectory`]: registry table or schema-scan tenant discovery
//! - [`bootstrap`]: idempotent DDL for the registry and tenant schemas

pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod health;
pub mod ingest;
pub mod postgres;
pub mod registry;
pub mod session;

pub use bootstrap::{bootstrap_tenant, ensure_registry, register_tenant};
pub use config::PoolSettings;
pub use directory::{list_tenants, RegistryDirectory, SchemaScanDirectory, TenantDirectory};
pub use health::check_connection;
pub use ingest::{insert_embedding, insert_raw_event};
pub use postgres::{PgConnector, PgTenantSession};
pub use registry::PoolRegistry;
pub use session::{TenantConnector, TenantSession, TenantWriter};

pub use deadpool_postgres::Pool;
