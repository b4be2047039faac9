//! Ephemeral session documents.
//!
//! A `SessionDocument` is the JSON value stored under `session:<correspondent>`
//! in the ephemeral store while a conversation is active. Field names on the
//! wire are kept stable for documents written by earlier deployments, so the
//! Rust names are mapped with `#[serde(rename)]`.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::DocumentError;

/// Current version of the ephemeral document schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Key prefix for session documents.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Key prefix for interest records.
pub const INTERESTS_KEY_PREFIX: &str = "interests:";

/// Ephemeral-store key for a correspondent's session.
pub fn session_key(correspondent_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{correspondent_id}")
}

/// Ephemeral-store key for the interest record of an analysis thread.
pub fn interests_key(analysis_thread_id: &str) -> String {
    format!("{INTERESTS_KEY_PREFIX}{analysis_thread_id}")
}

/// Extract the correspondent id from a `session:` key.
pub fn correspondent_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(SESSION_KEY_PREFIX).filter(|id| !id.is_empty())
}

/// Documents written before the `schema_version` field existed are version 1.
pub(crate) fn legacy_schema_version() -> u32 {
    1
}

/// A JSON document stored in the ephemeral store with an explicit schema version.
pub trait VersionedDocument: Serialize + DeserializeOwned {
    fn schema_version(&self) -> u32;
}

/// Decode a raw ephemeral document, rejecting unknown schema versions.
pub fn decode_document<T: VersionedDocument>(raw: &str) -> Result<T, DocumentError> {
    let doc: T = serde_json::from_str(raw).map_err(|e| DocumentError::Json(e.to_string()))?;
    match doc.schema_version() {
        SCHEMA_VERSION => Ok(doc),
        other => Err(DocumentError::UnsupportedVersion(other)),
    }
}

/// Encode a document to its JSON wire form.
pub fn encode_document<T: VersionedDocument>(doc: &T) -> Result<String, DocumentError> {
    serde_json::to_string(doc).map_err(|e| DocumentError::Json(e.to_string()))
}

/// Lifecycle state of a session.
///
/// Only `Active` sessions live in the ephemeral store; `Archived` is the
/// terminal state written to durable storage by the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Archived,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionState::Active),
            "archived" => Ok(SessionState::Archived),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

/// Direction of a transcript entry relative to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incoming" => Ok(Direction::Incoming),
            "outgoing" => Ok(Direction::Outgoing),
            other => Err(format!("invalid message direction: '{other}'")),
        }
    }
}

/// Identity of the external party a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondentInfo {
    /// Stable external identity (phone number).
    #[serde(rename = "phone")]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// One message in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "message")]
    pub text: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub direction: Direction,
}

impl TranscriptEntry {
    pub fn incoming(text: impl Into<String>, sender: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            timestamp: at,
            direction: Direction::Incoming,
        }
    }

    pub fn outgoing(text: impl Into<String>, sender: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            timestamp: at,
            direction: Direction::Outgoing,
        }
    }
}

/// The ephemeral session of one correspondent.
///
/// Thread ids are assigned once at creation and never change for the
/// lifetime of the document. The transcript is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    pub user_info: CorrespondentInfo,
    #[serde(rename = "thread")]
    pub conversation_thread_id: String,
    #[serde(rename = "thread_analizer")]
    pub analysis_thread_id: String,
    pub state: SessionState,
    pub messages: Vec<TranscriptEntry>,
    #[serde(rename = "start_timestamp")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "last_activity")]
    pub last_activity_at: DateTime<Utc>,
}

impl SessionDocument {
    /// Start a new active session whose transcript holds the first inbound entry.
    pub fn start(
        correspondent: CorrespondentInfo,
        conversation_thread_id: String,
        analysis_thread_id: String,
        first: TranscriptEntry,
    ) -> Self {
        let at = first.timestamp;
        Self {
            schema_version: SCHEMA_VERSION,
            user_info: correspondent,
            conversation_thread_id,
            analysis_thread_id,
            state: SessionState::Active,
            messages: vec![first],
            started_at: at,
            last_activity_at: at,
        }
    }

    pub fn correspondent_id(&self) -> &str {
        &self.user_info.id
    }

    /// Append a transcript entry and move `last_activity_at` to its timestamp.
    pub fn append(&mut self, entry: TranscriptEntry) {
        self.last_activity_at = entry.timestamp;
        self.messages.push(entry);
    }

    /// Whether the session has been idle for strictly longer than `threshold`.
    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now.signed_duration_since(self.last_activity_at) > threshold
    }
}

impl VersionedDocument for SessionDocument {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
}
