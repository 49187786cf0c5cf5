//! Shared test fixtures: mock collaborator gateways and engine setup
//!
//! The queue store under test is always the real in-memory implementation;
//! only the external services (question, room, identity) are mocked.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use pairup::clients::identity::IdentityClient;
use pairup::clients::question::QuestionClient;
use pairup::clients::room::RoomClient;
use pairup::error::{MatchingError, Result};
use pairup::matching::engine::{MatchEngine, MatchEngineSettings};
use pairup::metrics::MetricsCollector;
use pairup::queue::store::InMemoryQueueStore;
use pairup::taxonomy::TaxonomyCache;
use pairup::types::{Complexity, Language, Question, RoomReference, UserId};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Session tokens in tests follow the convention `token-<user-id>`
pub fn token_for(user_id: &str) -> String {
    format!("token-{}", user_id)
}

/// Question service mock with a fixed taxonomy and togglable availability
pub struct MockQuestionClient {
    pub categories: Vec<String>,
    pub languages: Vec<Language>,
    /// When false, every lookup reports "no matching question"
    pub question_available: AtomicBool,
    /// Category filters seen by find_question, in call order
    pub lookups: Mutex<Vec<Vec<String>>>,
}

impl MockQuestionClient {
    pub fn new() -> Self {
        Self {
            categories: ["Array", "Graph", "Stack", "String"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            languages: vec![
                Language {
                    language: "Python 3".to_string(),
                    lang_slug: "python3".to_string(),
                },
                Language {
                    language: "Rust".to_string(),
                    lang_slug: "rust".to_string(),
                },
            ],
            question_available: AtomicBool::new(true),
            lookups: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QuestionClient for MockQuestionClient {
    async fn fetch_categories(&self) -> Result<Vec<String>> {
        Ok(self.categories.clone())
    }

    async fn fetch_languages(&self) -> Result<Vec<Language>> {
        Ok(self.languages.clone())
    }

    async fn find_question(
        &self,
        complexity: Complexity,
        _language: &str,
        categories: &[String],
    ) -> Result<Option<Question>> {
        self.lookups.lock().unwrap().push(categories.to_vec());

        if !self.question_available.load(Ordering::SeqCst) {
            return Ok(None);
        }

        // Question id encodes the filter so tests can assert on it.
        let category = categories.first().map(String::as_str).unwrap_or("any");
        Ok(Some(Question {
            id: format!("q-{}-{}", complexity, category),
            title: Some(format!("{} problem", category)),
        }))
    }
}

/// Room service mock that remembers created rooms and answers membership
/// lookups from them
pub struct MockRoomClient {
    pub rooms: Mutex<Vec<RoomReference>>,
    room_counter: AtomicUsize,
    /// When true, room creation fails with a 500 passthrough
    pub fail_creation: AtomicBool,
}

impl MockRoomClient {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(Vec::new()),
            room_counter: AtomicUsize::new(0),
            fail_creation: AtomicBool::new(false),
        }
    }

    pub fn room_for_user(&self, user_id: &str) -> Option<RoomReference> {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|room| room.user_ids.iter().any(|id| id == user_id))
            .cloned()
    }
}

#[async_trait]
impl RoomClient for MockRoomClient {
    async fn create_room(
        &self,
        user_ids: &[UserId],
        question_id: &str,
        lang_slug: &str,
    ) -> Result<RoomReference> {
        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(MatchingError::Downstream {
                service: "room-service".to_string(),
                status: 500,
                message: "room creation rejected".to_string(),
            }
            .into());
        }

        let n = self.room_counter.fetch_add(1, Ordering::SeqCst);
        let room = RoomReference {
            room_id: format!("room-{}", n),
            user_ids: user_ids.to_vec(),
            question_id: question_id.to_string(),
            lang_slug: lang_slug.to_string(),
        };
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }

    async fn find_room(&self, session_token: &str) -> Result<Option<serde_json::Value>> {
        let user_id = session_token.strip_prefix("token-").unwrap_or_default();
        Ok(self.room_for_user(user_id).map(|room| {
            json!({
                "room-id": room.room_id,
                "user-ids": room.user_ids,
            })
        }))
    }
}

/// Identity mock honoring the `token-<user-id>` convention
pub struct MockIdentityClient;

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn resolve(&self, session_token: &str) -> Result<UserId> {
        match session_token.strip_prefix("token-") {
            Some(user_id) if !user_id.is_empty() => Ok(user_id.to_string()),
            _ => Err(MatchingError::Unauthorized {
                message: "unknown session token".to_string(),
            }
            .into()),
        }
    }
}

/// Complete engine wired against the real store and mock gateways
pub struct TestSystem {
    pub engine: Arc<MatchEngine>,
    pub store: Arc<InMemoryQueueStore>,
    pub question_client: Arc<MockQuestionClient>,
    pub room_client: Arc<MockRoomClient>,
    pub metrics: Arc<MetricsCollector>,
}

pub fn create_test_system_with_ttl(queue_ttl: Duration) -> TestSystem {
    let store = Arc::new(InMemoryQueueStore::new());
    let metrics = Arc::new(MetricsCollector::new().expect("metrics"));
    let question_client = Arc::new(MockQuestionClient::new());
    let room_client = Arc::new(MockRoomClient::new());

    let taxonomy = Arc::new(TaxonomyCache::new(
        question_client.clone(),
        Duration::from_secs(600),
        metrics.clone(),
    ));

    let engine = Arc::new(MatchEngine::new(
        store.clone(),
        taxonomy,
        question_client.clone(),
        room_client.clone(),
        metrics.clone(),
        MatchEngineSettings {
            queue_ttl,
            default_language: "python3".to_string(),
        },
    ));

    TestSystem {
        engine,
        store,
        question_client,
        room_client,
        metrics,
    }
}

pub fn create_test_system() -> TestSystem {
    create_test_system_with_ttl(Duration::from_secs(30))
}
