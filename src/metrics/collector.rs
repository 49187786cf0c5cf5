//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the pairup matchmaking
//! service using Prometheus metrics, exposed on the `/metrics` endpoint.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Queue and matching metrics
    queue_metrics: QueueMetrics,

    /// Taxonomy cache metrics
    taxonomy_metrics: TaxonomyMetrics,
}

/// Queue and matching metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Join attempts by outcome (queued, matched, already_queued, already_roomed, failed)
    pub joins_total: IntCounterVec,

    /// Rooms created through successful matches
    pub rooms_created_total: IntCounter,

    /// Explicit leaves that actually removed an entry
    pub leaves_total: IntCounter,

    /// Entries evicted by the expiry sweeper
    pub entries_expired_total: IntCounter,

    /// Entries currently waiting in the queue
    pub queue_depth: IntGauge,

    /// Join handling duration
    pub join_duration_seconds: Histogram,
}

/// Taxonomy cache metrics
#[derive(Clone)]
pub struct TaxonomyMetrics {
    /// Refresh attempts by result (success, failure, empty)
    pub refreshes_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let joins_total = IntCounterVec::new(
            Opts::new("pairup_joins_total", "Join attempts by outcome"),
            &["outcome"],
        )?;
        let rooms_created_total = IntCounter::with_opts(Opts::new(
            "pairup_rooms_created_total",
            "Rooms created through successful matches",
        ))?;
        let leaves_total = IntCounter::with_opts(Opts::new(
            "pairup_leaves_total",
            "Explicit leaves that removed a queue entry",
        ))?;
        let entries_expired_total = IntCounter::with_opts(Opts::new(
            "pairup_entries_expired_total",
            "Queue entries evicted by the expiry sweeper",
        ))?;
        let queue_depth = IntGauge::with_opts(Opts::new(
            "pairup_queue_depth",
            "Entries currently waiting in the queue",
        ))?;
        let join_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pairup_join_duration_seconds",
            "Join handling duration in seconds",
        ))?;
        let refreshes_total = IntCounterVec::new(
            Opts::new(
                "pairup_taxonomy_refreshes_total",
                "Taxonomy refresh attempts by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(joins_total.clone()))?;
        registry.register(Box::new(rooms_created_total.clone()))?;
        registry.register(Box::new(leaves_total.clone()))?;
        registry.register(Box::new(entries_expired_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(join_duration_seconds.clone()))?;
        registry.register(Box::new(refreshes_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            queue_metrics: QueueMetrics {
                joins_total,
                rooms_created_total,
                leaves_total,
                entries_expired_total,
                queue_depth,
                join_duration_seconds,
            },
            taxonomy_metrics: TaxonomyMetrics { refreshes_total },
        })
    }

    /// Queue and matching metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Taxonomy cache metrics
    pub fn taxonomy(&self) -> &TaxonomyMetrics {
        &self.taxonomy_metrics
    }

    /// Record a join attempt outcome
    pub fn record_join_outcome(&self, outcome: &str) {
        self.queue_metrics
            .joins_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Encode all registered metrics in the Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registration against a fresh registry cannot collide.
        Self::new().expect("metrics registration failed")
    }
}
