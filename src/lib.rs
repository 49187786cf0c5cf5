//! Pairup - Matchmaking microservice for collaborative rooms
//!
//! This crate pairs waiting users into shared rooms based on overlapping
//! preferences (complexity, category set, language), backed by a TTL-bound
//! queue store with an atomic find-and-remove matching operation.

pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod matching;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod taxonomy;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchingError, Result};
pub use types::*;

// Re-export key components
pub use matching::MatchEngine;
pub use queue::{InMemoryQueueStore, QueueStore};
pub use taxonomy::TaxonomyCache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
