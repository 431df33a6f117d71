//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::settings::StoreBackend;
use super::Settings;
use crate::utils::errors::{EventHubError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_admission_config(&settings.admission)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(EventHubError::Config("Server host is required".to_string()));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.backend == StoreBackend::Memory {
        return Ok(());
    }

    if config.url.is_empty() {
        return Err(EventHubError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    if config.acquire_timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Acquire timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate token verification configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(EventHubError::Config("JWT secret is required".to_string()));
    }

    Ok(())
}

/// Validate admission controller configuration
fn validate_admission_config(config: &super::AdmissionConfig) -> Result<()> {
    if config.max_store_attempts == 0 {
        return Err(EventHubError::Config(
            "Max store attempts must be at least 1".to_string(),
        ));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(EventHubError::Config(format!(
            "Base delay ({}ms) cannot be greater than max delay ({}ms)",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitSettings) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.max_requests == 0 {
        return Err(EventHubError::Config(
            "Rate limit max requests must be greater than 0".to_string(),
        ));
    }

    if config.window_seconds == 0 {
        return Err(EventHubError::Config(
            "Rate limit window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
