//! Services module
//!
//! This module contains business logic services

pub mod admission;
pub mod events;
pub mod retry;

// Re-export commonly used services
pub use admission::AdmissionController;
pub use events::EventService;
pub use retry::RetryPolicy;

use serde::Serialize;

use crate::config::Settings;
use crate::database::DatabaseService;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub admission: AdmissionController,
    pub event_service: EventService,
    database: DatabaseService,
}

impl ServiceFactory {
    pub fn new(database: DatabaseService, settings: &Settings) -> Self {
        let admission = AdmissionController::new(database.events.clone(), &settings.admission);
        let event_service = EventService::new(database.catalog.clone(), database.events.clone());

        Self {
            admission,
            event_service,
            database,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let store_error = self.database.health_check().await.err().map(|e| e.to_string());

        ServiceHealthStatus {
            store_healthy: store_error.is_none(),
            store_error,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

impl ServiceHealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(error) = &self.store_error {
            issues.push(format!("Event store unavailable: {}", error));
        }
        issues
    }
}
