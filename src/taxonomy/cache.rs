//! Process-local cache of the question catalog's taxonomy
//!
//! Holds the current valid category and language sets, refreshed from the
//! question service when stale. Reads never block on a refresh: a stale read
//! stamps the refresh time immediately (preventing refresh storms), kicks an
//! asynchronous refresh, and returns the previous snapshot. A failed or empty
//! refresh retains the last-known-good data; adopting an empty taxonomy would
//! degrade every normalized request to "any category" and defeat matching
//! precision.

use crate::clients::question::QuestionClient;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};

/// Category labels used until the first successful refresh
const SEED_CATEGORIES: &[&str] = &[
    "Array",
    "Binary Search",
    "Bit Manipulation",
    "Breadth-First Search",
    "Depth-First Search",
    "Design",
    "Divide and Conquer",
    "Doubly-Linked List",
    "Dynamic Programming",
    "Graph",
    "Greedy",
    "Hash Function",
    "Hash Table",
    "Heap (Priority Queue)",
    "Linked List",
    "Math",
    "Memoization",
    "Merge Sort",
    "Monotonic Queue",
    "Queue",
    "Recursion",
    "Rolling Hash",
    "Simulation",
    "Sliding Window",
    "Stack",
    "String",
    "Topological Sort",
    "Two Pointers",
];

/// Language slugs used until the first successful refresh
const SEED_LANGUAGES: &[&str] = &[
    "cpp",
    "java",
    "python",
    "python3",
    "c",
    "csharp",
    "javascript",
    "typescript",
    "php",
    "swift",
    "kotlin",
    "dart",
    "golang",
    "ruby",
    "scala",
    "rust",
    "racket",
    "erlang",
    "elixir",
];

/// Immutable view of the taxonomy at one point in time
#[derive(Debug, Clone)]
pub struct TaxonomySnapshot {
    pub categories: Vec<String>,
    pub languages: Vec<String>,
}

#[derive(Debug)]
struct CacheState {
    categories: Vec<String>,
    languages: Vec<String>,
    last_refreshed: DateTime<Utc>,
}

/// Cache of valid categories and languages, refreshed from the question
/// service. One instance per process; slight skew across service instances
/// is tolerated by design.
pub struct TaxonomyCache {
    question_client: Arc<dyn QuestionClient>,
    metrics: Arc<MetricsCollector>,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
}

impl TaxonomyCache {
    pub fn new(
        question_client: Arc<dyn QuestionClient>,
        refresh_interval: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            question_client,
            metrics,
            refresh_interval,
            state: RwLock::new(CacheState {
                categories: SEED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
                languages: SEED_LANGUAGES.iter().map(|l| l.to_string()).collect(),
                last_refreshed: current_timestamp(),
            }),
        }
    }

    /// Current snapshot. Kicks a non-blocking refresh when the cache is
    /// stale; the caller always gets the previous data immediately.
    pub fn snapshot(self: &Arc<Self>) -> TaxonomySnapshot {
        let stale = {
            let state = match self.state.read() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            let age = current_timestamp() - state.last_refreshed;
            age.to_std().unwrap_or_default() > self.refresh_interval
        };

        if stale {
            self.mark_refreshed();
            let cache = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = cache.refresh().await {
                    warn!("Background taxonomy refresh failed: {}", e);
                }
            });
        }

        let state = match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        TaxonomySnapshot {
            categories: state.categories.clone(),
            languages: state.languages.clone(),
        }
    }

    /// Pull the latest taxonomy from the question service.
    ///
    /// Idempotent and safe to call concurrently with reads. Each set is
    /// adopted independently and only when non-empty.
    pub async fn refresh(&self) -> Result<()> {
        self.mark_refreshed();

        match self.question_client.fetch_categories().await {
            Ok(categories) if categories.is_empty() => {
                warn!("Question service returned an empty category set; keeping previous");
                self.record("empty");
            }
            Ok(categories) => {
                info!("Adopted {} categories from question service", categories.len());
                self.write_state(|state| state.categories = categories);
                self.record("success");
            }
            Err(e) => {
                warn!("Category refresh failed, keeping previous set: {}", e);
                self.record("failure");
            }
        }

        match self.question_client.fetch_languages().await {
            Ok(languages) if languages.is_empty() => {
                warn!("Question service returned an empty language set; keeping previous");
                self.record("empty");
            }
            Ok(languages) => {
                info!("Adopted {} languages from question service", languages.len());
                let slugs = languages.into_iter().map(|l| l.lang_slug).collect();
                self.write_state(|state| state.languages = slugs);
                self.record("success");
            }
            Err(e) => {
                warn!("Language refresh failed, keeping previous set: {}", e);
                self.record("failure");
            }
        }

        Ok(())
    }

    fn mark_refreshed(&self) {
        self.write_state(|state| state.last_refreshed = current_timestamp());
    }

    fn write_state(&self, apply: impl FnOnce(&mut CacheState)) {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut state);
    }

    fn record(&self, result: &str) {
        self.metrics
            .taxonomy()
            .refreshes_total
            .with_label_values(&[result])
            .inc();
    }
}
