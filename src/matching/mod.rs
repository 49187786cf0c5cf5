//! Preference normalization and the match engine
//!
//! The engine implements the join/status/leave protocol and the per-user
//! state machine (none, queued, roomed); the normalizer turns raw untrusted
//! input into a canonical preference record it can match on.

pub mod engine;
pub mod normalizer;

pub use engine::MatchEngine;
pub use normalizer::normalize;
