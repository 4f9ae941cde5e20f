use std::sync::Arc;

use crate::models::todo::Todo;
use crate::repositories::TodoRepo;
use crate::store::{MemoryBackend, RecordBackend, StoreResult};

/// Default PostgreSQL pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Which backend persists records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// Process-local storage, lost on restart.
    Memory,
}

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Maximum pooled PostgreSQL connections (default: `20`).
    pub max_connections: u32,
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                         |
    /// |----------------------|---------------------------------|
    /// | `STORE_BACKEND`      | `postgres` (or `memory`)        |
    /// | `DATABASE_URL`       | required when backend=postgres  |
    /// | `DB_MAX_CONNECTIONS` | `20`                            |
    ///
    /// # Panics
    ///
    /// Panics on an unknown `STORE_BACKEND`, or if `DATABASE_URL` is missing
    /// for the postgres backend.
    pub fn from_env() -> Self {
        let backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .as_str()
        {
            "postgres" => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            },
            "memory" => StoreBackend::Memory,
            other => panic!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONNECTIONS.to_string())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        Self {
            backend,
            max_connections,
        }
    }

    /// In-memory configuration, used by tests and local demos.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Open the todo backend. For PostgreSQL this connects, checks health,
    /// and applies pending migrations.
    pub async fn open_todo_backend(&self) -> StoreResult<Arc<dyn RecordBackend<Todo>>> {
        match &self.backend {
            StoreBackend::Postgres { database_url } => {
                let pool = crate::create_pool(database_url, self.max_connections).await?;
                tracing::info!("Database connection pool created");

                crate::health_check(&pool).await?;
                tracing::info!("Database health check passed");

                crate::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");

                Ok(TodoRepo::postgres_backend(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Ok(Arc::new(MemoryBackend::<Todo>::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_config_opens_a_working_backend() {
        let backend = StoreConfig::memory().open_todo_backend().await.unwrap();
        backend.ping().await.unwrap();
    }
}
