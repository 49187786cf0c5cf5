//! Health check reporting
//!
//! This module provides health check functionality for the pairup service,
//! backing the `/health` endpoint and the periodic health log line.

use crate::metrics::MetricsCollector;
use crate::queue::store::QueueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Users currently waiting in the queue
    pub users_waiting: usize,
    /// Rooms created since service start
    pub rooms_created: u64,
    /// Queue entries evicted by expiry since service start
    pub entries_expired: u64,
    /// Explicit leaves since service start
    pub leaves: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

impl HealthCheck {
    /// Probe the queue store and assemble current service statistics
    pub async fn check(
        store: &Arc<dyn QueueStore>,
        metrics: &MetricsCollector,
        service_name: &str,
    ) -> Self {
        let started = Instant::now();
        let (store_check, users_waiting) = match store.waiting_count().await {
            Ok(count) => (
                ComponentCheck {
                    name: "queue-store".to_string(),
                    status: HealthStatus::Healthy,
                    message: None,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
                count,
            ),
            Err(e) => (
                ComponentCheck {
                    name: "queue-store".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: Some(e.to_string()),
                    duration_ms: started.elapsed().as_millis() as u64,
                },
                0,
            ),
        };

        let status = store_check.status.clone();
        Self {
            status,
            service: service_name.to_string(),
            version: crate::VERSION.to_string(),
            timestamp: crate::utils::current_timestamp(),
            checks: vec![store_check],
            stats: ServiceStats {
                users_waiting,
                rooms_created: metrics.queue().rooms_created_total.get(),
                entries_expired: metrics.queue().entries_expired_total.get(),
                leaves: metrics.queue().leaves_total.get(),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
