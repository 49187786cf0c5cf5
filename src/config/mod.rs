//! Configuration management for the pairup service
//!
//! This module handles all configuration loading from environment variables,
//! TOML files, validation, and default values for the matchmaking service.

pub mod app;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, EndpointSettings, MatchmakingSettings, ServiceSettings,
};
