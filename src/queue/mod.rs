//! Queue store and expiry sweeping
//!
//! This module holds the shared pool of waiting users: the `QueueStore`
//! contract with its atomic find-and-remove operation, the in-memory
//! implementation, and the background sweeper that evicts expired entries.

pub mod store;
pub mod sweeper;

pub use store::{InMemoryQueueStore, QueueStore};
pub use sweeper::QueueSweeper;
