//! Shared application state for HTTP handlers

use axum::extract::FromRef;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::middleware::{AuthMiddleware, RateLimitMiddleware};
use crate::services::ServiceFactory;

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub auth: AuthMiddleware,
    pub rate_limiter: RateLimitMiddleware,
}

impl AppState {
    pub fn new(database: DatabaseService, settings: &Settings) -> Self {
        Self {
            services: ServiceFactory::new(database, settings),
            auth: AuthMiddleware::new(&settings.auth),
            rate_limiter: RateLimitMiddleware::from_settings(&settings.rate_limit),
        }
    }
}

impl FromRef<AppState> for AuthMiddleware {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
