//! Database service layer
//!
//! This module wires a concrete backend into the two storage seams and hands
//! them out as shared handles.

use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::database::connection::{create_pool, run_migrations, DatabasePool};
use crate::database::memory::InMemoryEventStore;
use crate::database::repositories::EventRepository;
use crate::database::store::{EventCatalog, EventStore, SharedEventCatalog, SharedEventStore};
use crate::utils::errors::EventHubError;

#[derive(Clone)]
pub struct DatabaseService {
    pub events: SharedEventStore,
    pub catalog: SharedEventCatalog,
}

impl DatabaseService {
    /// Use one backend for both seams
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: EventStore + EventCatalog + 'static,
    {
        Self {
            events: backend.clone(),
            catalog: backend,
        }
    }

    pub fn postgres(pool: DatabasePool) -> Self {
        Self::from_backend(Arc::new(EventRepository::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryEventStore::new()))
    }

    /// Connect to the configured backend, running migrations for PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EventHubError> {
        match config.backend {
            StoreBackend::Postgres => {
                let pool = create_pool(config).await?;
                run_migrations(&pool).await?;
                Ok(Self::postgres(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory event store; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub async fn health_check(&self) -> Result<(), EventHubError> {
        self.events.health_check().await?;
        Ok(())
    }
}
