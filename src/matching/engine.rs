//! Match engine: the join/status/leave protocol
//!
//! Coordinates the queue store, taxonomy cache and external gateways to
//! resolve a queue request into either "joined queue" or "room created".
//! Correctness under concurrent joins rests entirely on the store's atomic
//! find-and-remove; the engine itself holds no locks.

use crate::clients::question::QuestionClient;
use crate::clients::room::RoomClient;
use crate::error::{MatchingError, Result};
use crate::matching::normalizer::normalize;
use crate::metrics::MetricsCollector;
use crate::queue::store::QueueStore;
use crate::taxonomy::TaxonomyCache;
use crate::types::{
    Complexity, JoinOutcome, MatchRequest, Question, QueueEntry, QueueStatus, RawMatchRequest,
    UserId,
};
use crate::utils::{current_timestamp, intersect_categories};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Engine settings carved out of the application config
#[derive(Debug, Clone)]
pub struct MatchEngineSettings {
    /// How long a queue entry lives before passive expiry
    pub queue_ttl: Duration,
    /// Language substituted for missing or unknown choices
    pub default_language: String,
}

/// The match engine. One per process; any number of engine instances may run
/// against the same shared queue store.
pub struct MatchEngine {
    store: Arc<dyn QueueStore>,
    taxonomy: Arc<TaxonomyCache>,
    question_client: Arc<dyn QuestionClient>,
    room_client: Arc<dyn RoomClient>,
    metrics: Arc<MetricsCollector>,
    settings: MatchEngineSettings,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        taxonomy: Arc<TaxonomyCache>,
        question_client: Arc<dyn QuestionClient>,
        room_client: Arc<dyn RoomClient>,
        metrics: Arc<MetricsCollector>,
        settings: MatchEngineSettings,
    ) -> Self {
        Self {
            store,
            taxonomy,
            question_client,
            room_client,
            metrics,
            settings,
        }
    }

    /// Where is this user right now: queued, roomed, or neither?
    ///
    /// A `NotQueued` resolution carries the current taxonomy snapshot,
    /// advertised as the valid choices for a subsequent join.
    pub async fn status(&self, user_id: &str, session_token: &str) -> Result<QueueStatus> {
        if let Some(entry) = self.store.find_by_user(user_id).await? {
            debug!("User {}: in queue", user_id);
            return Ok(QueueStatus::Queued(entry));
        }

        if let Some(room) = self.room_client.find_room(session_token).await? {
            info!("User {}: already matched into a room", user_id);
            return Ok(QueueStatus::Roomed(room));
        }

        let snapshot = self.taxonomy.snapshot();
        Ok(QueueStatus::NotQueued {
            complexities: Complexity::ALL.to_vec(),
            categories: snapshot.categories,
            languages: snapshot.languages,
        })
    }

    /// Attempt to join the queue, matching against waiting users first.
    pub async fn join(
        &self,
        user_id: &str,
        session_token: &str,
        raw: RawMatchRequest,
    ) -> Result<JoinOutcome> {
        let timer = self.metrics.queue().join_duration_seconds.start_timer();
        let outcome = self.join_inner(user_id, session_token, raw).await;
        timer.observe_duration();
        outcome
    }

    async fn join_inner(
        &self,
        user_id: &str,
        session_token: &str,
        raw: RawMatchRequest,
    ) -> Result<JoinOutcome> {
        // Idempotency protection against duplicate join spam.
        if let Some(entry) = self.store.find_by_user(user_id).await? {
            info!("User {}: already in queue, rejecting duplicate join", user_id);
            self.metrics.record_join_outcome("already_queued");
            return Ok(JoinOutcome::AlreadyQueued(entry));
        }

        if let Some(room) = self.room_client.find_room(session_token).await? {
            info!("User {}: already in a room, redirecting", user_id);
            self.metrics.record_join_outcome("already_roomed");
            return Ok(JoinOutcome::AlreadyRoomed(room));
        }

        let snapshot = self.taxonomy.snapshot();
        let request = normalize(&raw, &snapshot, &self.settings.default_language);

        match self.store.find_and_remove_compatible(&request).await? {
            Some(partner) => {
                self.resolve_match(user_id, &request, partner).await
            }
            None => self.enqueue(user_id, request).await,
        }
    }

    /// A partner was atomically consumed from the queue: pick a question and
    /// create the room.
    ///
    /// If anything downstream fails past this point the partner's entry is
    /// not restored; they re-discover their state on the next status poll
    /// and re-join. Restoring would race against that very re-join.
    async fn resolve_match(
        &self,
        user_id: &str,
        request: &MatchRequest,
        partner: QueueEntry,
    ) -> Result<JoinOutcome> {
        // Non-empty by the store's matching predicate.
        let shared = intersect_categories(&partner.categories, &request.categories);
        info!(
            "User {}: matched with {} on categories {:?}",
            user_id, partner.user_id, shared
        );

        let question = match self.pick_question(request, &shared).await {
            Ok(question) => question,
            Err(e) => {
                warn!(
                    "User {}: question lookup failed after consuming {}'s entry; \
                     partner must re-join: {}",
                    user_id, partner.user_id, e
                );
                self.metrics.record_join_outcome("failed");
                return Err(e);
            }
        };

        let user_ids: Vec<UserId> = vec![user_id.to_string(), partner.user_id.clone()];
        match self
            .room_client
            .create_room(&user_ids, &question.id, &request.language)
            .await
        {
            Ok(room) => {
                info!(
                    "User {}: room {} created with {} (question {})",
                    user_id, room.room_id, partner.user_id, question.id
                );
                self.metrics.record_join_outcome("matched");
                self.metrics.queue().rooms_created_total.inc();
                Ok(JoinOutcome::RoomCreated(room))
            }
            Err(e) => {
                warn!(
                    "User {}: room creation failed after consuming {}'s entry; \
                     partner must re-join: {}",
                    user_id, partner.user_id, e
                );
                self.metrics.record_join_outcome("failed");
                Err(e)
            }
        }
    }

    /// Fetch a question for the matched preferences, broadening the category
    /// filter once if the full intersection has no questions.
    async fn pick_question(&self, request: &MatchRequest, shared: &[String]) -> Result<Question> {
        if let Some(question) = self
            .question_client
            .find_question(request.complexity, &request.language, shared)
            .await?
        {
            return Ok(question);
        }

        info!(
            "No question for categories {:?}; retrying with complexity and language only",
            shared
        );
        if let Some(question) = self
            .question_client
            .find_question(request.complexity, &request.language, &[])
            .await?
        {
            return Ok(question);
        }

        Err(MatchingError::QuestionUnavailable {
            reason: format!(
                "no {} question in {} even without a category filter",
                request.complexity, request.language
            ),
        }
        .into())
    }

    /// No compatible partner: insert the caller as a fresh waiting entry.
    async fn enqueue(&self, user_id: &str, request: MatchRequest) -> Result<JoinOutcome> {
        let now = current_timestamp();
        let ttl = ChronoDuration::from_std(self.settings.queue_ttl).unwrap_or_else(|_| {
            ChronoDuration::seconds(30)
        });

        let entry = QueueEntry {
            user_id: user_id.to_string(),
            complexity: request.complexity,
            categories: request.categories,
            language: request.language,
            enqueued_at: now,
            expires_at: now + ttl,
        };

        self.store.insert(entry.clone()).await?;

        info!(
            "User {}: joined queue with {}, {} (expires {})",
            user_id, entry.complexity, entry.language, entry.expires_at
        );
        self.metrics.record_join_outcome("queued");
        if let Ok(depth) = self.store.waiting_count().await {
            self.metrics.queue().queue_depth.set(depth as i64);
        }

        Ok(JoinOutcome::Queued(entry))
    }

    /// Explicit leave. Idempotent: leaving with no entry is a no-op.
    pub async fn leave(&self, user_id: &str) -> Result<bool> {
        let removed = self.store.remove_by_user(user_id).await?;
        if removed {
            info!("User {}: removed from queue", user_id);
            self.metrics.queue().leaves_total.inc();
            if let Ok(depth) = self.store.waiting_count().await {
                self.metrics.queue().queue_depth.set(depth as i64);
            }
        } else {
            debug!("User {}: leave with no queue entry, nothing to do", user_id);
        }
        Ok(removed)
    }
}
