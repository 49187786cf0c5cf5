//! Main application configuration
//!
//! This module defines the primary configuration structures for the pairup
//! matchmaking service, including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub endpoints: EndpointSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host to bind the HTTP server to
    pub bind_host: String,
    /// Port for the queue API, health and metrics endpoints
    pub bind_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Base URLs and timeouts for the external collaborator services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Question service base URL (categories, languages, question matching)
    pub question_service_url: String,
    /// Room service base URL (room creation and membership lookup)
    pub room_service_url: String,
    /// Identity provider base URL (session token resolution)
    pub identity_service_url: String,
    /// Timeout applied to every outbound HTTP call, in milliseconds
    pub request_timeout_ms: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// How long a queue entry lives before passive expiry, in seconds
    pub queue_ttl_seconds: u64,
    /// Interval between expired-entry sweeps, in seconds
    pub sweep_interval_seconds: u64,
    /// Taxonomy staleness threshold and background sync interval, in seconds
    pub taxonomy_refresh_seconds: u64,
    /// Language substituted when the client's choice is missing or unknown
    pub default_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            endpoints: EndpointSettings::default(),
            matchmaking: MatchmakingSettings::default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pairup".to_string(),
            log_level: "info".to_string(),
            bind_host: "0.0.0.0".to_string(),
            bind_port: 9003,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            question_service_url: "http://localhost:9001".to_string(),
            room_service_url: "http://localhost:9002".to_string(),
            identity_service_url: "http://localhost:9000".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            queue_ttl_seconds: 30,
            sweep_interval_seconds: 5,
            taxonomy_refresh_seconds: 600, // 10 minutes
            default_language: "python3".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("BIND_HOST") {
            config.service.bind_host = host;
        }
        if let Ok(port) = env::var("BIND_PORT") {
            config.service.bind_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid BIND_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Endpoint settings
        if let Ok(url) = env::var("QUESTION_SERVICE_URL") {
            config.endpoints.question_service_url = url;
        }
        if let Ok(url) = env::var("ROOM_SERVICE_URL") {
            config.endpoints.room_service_url = url;
        }
        if let Ok(url) = env::var("IDENTITY_SERVICE_URL") {
            config.endpoints.identity_service_url = url;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_MS") {
            config.endpoints.request_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid REQUEST_TIMEOUT_MS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(ttl) = env::var("QUEUE_TTL_SECONDS") {
            config.matchmaking.queue_ttl_seconds = ttl
                .parse()
                .map_err(|_| anyhow!("Invalid QUEUE_TTL_SECONDS value: {}", ttl))?;
        }
        if let Ok(sweep) = env::var("SWEEP_INTERVAL_SECONDS") {
            config.matchmaking.sweep_interval_seconds = sweep
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_SECONDS value: {}", sweep))?;
        }
        if let Ok(refresh) = env::var("TAXONOMY_REFRESH_SECONDS") {
            config.matchmaking.taxonomy_refresh_seconds = refresh
                .parse()
                .map_err(|_| anyhow!("Invalid TAXONOMY_REFRESH_SECONDS value: {}", refresh))?;
        }
        if let Ok(language) = env::var("DEFAULT_LANGUAGE") {
            config.matchmaking.default_language = language;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get outbound request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.endpoints.request_timeout_ms)
    }

    /// Get queue entry TTL as Duration
    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.matchmaking.queue_ttl_seconds)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.matchmaking.sweep_interval_seconds)
    }

    /// Get taxonomy refresh interval as Duration
    pub fn taxonomy_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.matchmaking.taxonomy_refresh_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports and timeouts
    if config.service.bind_port == 0 {
        return Err(anyhow!("Bind port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.endpoints.request_timeout_ms == 0 {
        return Err(anyhow!("Request timeout must be greater than 0"));
    }

    // Validate endpoint URLs
    for (name, url) in [
        ("Question service URL", &config.endpoints.question_service_url),
        ("Room service URL", &config.endpoints.room_service_url),
        ("Identity service URL", &config.endpoints.identity_service_url),
    ] {
        if url.is_empty() {
            return Err(anyhow!("{} cannot be empty", name));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("{} must be an http(s) URL: {}", name, url));
        }
    }

    // Validate matchmaking settings
    if config.matchmaking.queue_ttl_seconds == 0 {
        return Err(anyhow!("Queue TTL must be greater than 0"));
    }
    if config.matchmaking.sweep_interval_seconds == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }
    if config.matchmaking.taxonomy_refresh_seconds == 0 {
        return Err(anyhow!("Taxonomy refresh interval must be greater than 0"));
    }
    if config.matchmaking.default_language.is_empty() {
        return Err(anyhow!("Default language cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.matchmaking.queue_ttl_seconds, 30);
        assert_eq!(config.matchmaking.default_language, "python3");
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let mut config = AppConfig::default();
        config.endpoints.room_service_url = "amqp://localhost".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut config = AppConfig::default();
        config.matchmaking.queue_ttl_seconds = 0;
        assert!(validate_config(&config).is_err());
    }
}
