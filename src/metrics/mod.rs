//! Metrics collection for the pairup service

pub mod collector;

pub use collector::MetricsCollector;
