//! Environment-driven storage configuration.

use std::sync::Arc;

use anyhow::{bail, Context};
use billing_core::{BillRepository, InMemoryBillRepository};
use tracing::info;

use crate::connection::DatabasePool;
use crate::postgres::PgBillRepository;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Which repository implementation backs the billing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local storage, for tests and single-node deployments.
    Memory,
    /// PostgreSQL, the production backend.
    Postgres,
}

/// Storage settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl StoreConfig {
    /// Read configuration from the environment, loading `.env` first if one
    /// is present.
    ///
    /// * `BILLING_STORE_BACKEND` selects `memory` or `postgres` (default
    ///   `memory`). There is no implicit fallback: selecting `postgres`
    ///   without a reachable database is a startup error.
    /// * `DATABASE_URL` is required for the postgres backend.
    /// * `BILLING_DB_MAX_CONNECTIONS` caps the pool (default 20).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = match std::env::var("BILLING_STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres,
            other => bail!("unknown BILLING_STORE_BACKEND '{}'", other),
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when BILLING_STORE_BACKEND=postgres");
        }

        let max_connections = match std::env::var("BILLING_DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .context("BILLING_DB_MAX_CONNECTIONS must be a positive integer")?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            backend,
            database_url,
            max_connections,
        })
    }

    /// Build the configured repository. The postgres backend connects and
    /// ensures the schema before returning.
    pub async fn build_repository(&self) -> anyhow::Result<Arc<dyn BillRepository>> {
        match self.backend {
            StoreBackend::Memory => {
                info!("using in-memory bill repository");
                Ok(Arc::new(InMemoryBillRepository::new()))
            }
            StoreBackend::Postgres => {
                let url = self
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let pool = DatabasePool::new(url, self.max_connections)
                    .await
                    .context("failed to connect to billing database")?;
                let repository = PgBillRepository::new(pool);
                repository
                    .ensure_schema()
                    .await
                    .context("failed to prepare billing schema")?;
                info!(
                    max_connections = self.max_connections,
                    "using postgres bill repository"
                );
                Ok(Arc::new(repository))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Process environment is shared across tests; serialize access.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn default_config_uses_memory_backend() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("BILLING_STORE_BACKEND");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("BILLING_STORE_BACKEND", "postgres");
        std::env::remove_var("DATABASE_URL");
        let result = StoreConfig::from_env();
        std::env::remove_var("BILLING_STORE_BACKEND");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("BILLING_STORE_BACKEND", "sqlite");
        let result = StoreConfig::from_env();
        std::env::remove_var("BILLING_STORE_BACKEND");
        assert!(result.is_err());
    }
}
