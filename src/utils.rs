//! Utility functions for the matchmaking service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Generate a correlation id for tracing a request across log lines
pub fn generate_request_id() -> Uuid {
    Uuid::new_v4()
}

/// Intersection of two category sets, preserving the order of `left`
pub fn intersect_categories(left: &[String], right: &[String]) -> Vec<String> {
    left.iter()
        .filter(|category| right.contains(category))
        .cloned()
        .collect()
}
