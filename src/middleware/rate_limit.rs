//! Rate limiting middleware
//!
//! Sliding-window limiter keyed by authenticated user, applied to every
//! mutating endpoint (event management and RSVP).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RateLimitSettings;
use crate::utils::errors::{EventHubError, Result};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Extra requests allowed in short bursts
    pub burst_allowance: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_duration: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_seconds),
            burst_allowance: settings.burst_allowance,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<Instant>,
    burst_used: u32,
    last_reset: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            requests: Vec::new(),
            burst_used: 0,
            last_reset: Instant::now(),
        }
    }

    /// Drop requests outside the window
    fn cleanup(&mut self, window_duration: Duration) {
        let now = Instant::now();
        self.requests
            .retain(|&time| now.duration_since(time) < window_duration);

        if self.last_reset.elapsed() > window_duration {
            self.burst_used = 0;
            self.last_reset = now;
        }
    }

    fn is_allowed(&mut self, config: &RateLimitConfig) -> bool {
        self.cleanup(config.window_duration);

        if (self.requests.len() as u32) < config.max_requests {
            return true;
        }

        if self.burst_used < config.burst_allowance {
            self.burst_used += 1;
            return true;
        }

        false
    }

    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<Uuid, RateLimitEntry>>>,
    enabled: bool,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig, enabled: bool) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
            enabled,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(RateLimitConfig::from(settings), settings.enabled)
    }

    /// Record a request for `user_id`, failing once the window is exhausted
    pub fn check_rate_limit(&self, user_id: Uuid) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut entries = self.entries();
        let entry = entries.entry(user_id).or_insert_with(RateLimitEntry::new);

        if entry.is_allowed(&self.config) {
            entry.record_request();
            debug!(%user_id, "Rate limit check passed");
            Ok(())
        } else {
            warn!(%user_id, "Rate limit exceeded");
            Err(EventHubError::RateLimitExceeded)
        }
    }

    /// Forget users idle for two windows (called periodically)
    pub fn cleanup_old_entries(&self) -> usize {
        let mut entries = self.entries();
        let keep_for = self.config.window_duration * 2;

        entries.retain(|_, entry| {
            entry
                .requests
                .iter()
                .any(|time| time.elapsed() < keep_for)
        });

        debug!(remaining_entries = entries.len(), "Cleaned up old rate limit entries");
        entries.len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, RateLimitEntry>> {
        // A panic while holding the lock leaves only counters behind
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimitMiddleware {
    fn default() -> Self {
        Self::new(RateLimitConfig::default(), true)
    }
}
