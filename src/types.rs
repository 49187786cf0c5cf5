//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for users, issued by the identity provider
pub type UserId = String;

/// Question difficulty requested by a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Easy,
    Medium,
    Hard,
}

impl Complexity {
    /// Every valid complexity label
    pub const ALL: [Complexity; 3] = [Complexity::Easy, Complexity::Medium, Complexity::Hard];

    /// Parse a raw label; labels are case-sensitive, matching the catalog
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Easy" => Some(Complexity::Easy),
            "Medium" => Some(Complexity::Medium),
            "Hard" => Some(Complexity::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Easy => "Easy",
            Complexity::Medium => "Medium",
            Complexity::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's outstanding match request, persisted in the queue store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub complexity: Complexity,
    /// Non-empty set of category labels drawn from the taxonomy
    pub categories: Vec<String>,
    pub language: String,
    #[serde(rename = "enqueuedAt")]
    pub enqueued_at: DateTime<Utc>,
    #[serde(rename = "expireAt")]
    pub expires_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether this entry has passed its expiry and must be treated as absent
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Canonical preference set produced by the normalizer.
///
/// Ephemeral: derived from raw client input once per join attempt and never
/// persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub complexity: Complexity,
    pub categories: Vec<String>,
    pub language: String,
}

/// Raw, untrusted preference input as received from the client.
///
/// Every field is optional; wrong-typed JSON values collapse to `None` so
/// normalization stays total.
#[derive(Debug, Clone, Default)]
pub struct RawMatchRequest {
    pub complexity: Option<String>,
    pub categories: Option<Vec<String>>,
    pub language: Option<String>,
}

impl RawMatchRequest {
    /// Leniently pull preference fields out of an arbitrary JSON value.
    ///
    /// A missing field, a non-string complexity/language or a non-array
    /// categories value all become `None`; non-string array members are
    /// skipped. Never fails.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let complexity = value
            .get("complexity")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let language = value
            .get("language")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let categories = value.get("categories").and_then(|v| v.as_array()).map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        });

        Self {
            complexity,
            categories,
            language,
        }
    }
}

/// A question chosen for a matched pair, owned by the question service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// A supported language as reported by the question service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub language: String,
    #[serde(rename = "langSlug")]
    pub lang_slug: String,
}

/// Foreign reference to a room created by the external room service.
///
/// The core never mutates room state; it only hands this back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReference {
    #[serde(rename = "room-id")]
    pub room_id: String,
    #[serde(rename = "user-ids")]
    pub user_ids: Vec<UserId>,
    #[serde(rename = "question-id")]
    pub question_id: String,
    #[serde(rename = "question-lang-slug")]
    pub lang_slug: String,
}

/// Resolution of a status query against the queue protocol
#[derive(Debug, Clone)]
pub enum QueueStatus {
    /// User holds a live queue entry
    Queued(QueueEntry),
    /// User is already in a room; the caller should follow up with the
    /// room service directly ("see other" semantics)
    Roomed(serde_json::Value),
    /// User is in neither queue nor room; the snapshot advertises the valid
    /// choices for a subsequent join
    NotQueued {
        complexities: Vec<Complexity>,
        categories: Vec<String>,
        languages: Vec<String>,
    },
}

/// Resolution of a join attempt
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// No compatible partner; the caller now waits in the queue
    Queued(QueueEntry),
    /// A partner was consumed from the queue and a room was created
    RoomCreated(RoomReference),
    /// The caller already holds a live queue entry (duplicate join)
    AlreadyQueued(QueueEntry),
    /// The caller is already a member of a room
    AlreadyRoomed(serde_json::Value),
}
