//! Message Relay Library
//!
//! Store-and-forward of point-to-point session messages. Every message is
//! addressed by `(session, from, to, seq)`, where `seq` counts messages per
//! ordered pair of parties. A message can be taken exactly once; anything
//! not taken within the TTL is swept.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod wire;

/// Relay error types
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message not found: {0}")]
    NotFound(MessageId),
    #[error("Message already stored: {0}")]
    Duplicate(MessageId),
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Address of one message
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageId {
    pub session_id: String,
    /// Sending party
    pub from: u32,
    /// Receiving party
    pub to: u32,
    /// Position in the `from -> to` stream, starting at 0
    pub seq: u64,
}

impl MessageId {
    pub fn new(session_id: &str, from: u32, to: u32, seq: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            from,
            to,
            seq,
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}->{}#{}", self.session_id, self.from, self.to, self.seq)
    }
}

/// Fresh random session identifier
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Stored message
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredMessage {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Message relay store
#[derive(Clone)]
pub struct MessageStore {
    messages: Arc<DashMap<MessageId, StoredMessage>>,
    ttl: Duration,
}

impl MessageStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            messages: Arc::new(DashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Store a message. A live address is never overwritten.
    pub fn put(&self, id: MessageId, payload: Vec<u8>) -> Result<()> {
        let now = Utc::now();
        let message = StoredMessage {
            payload,
            created_at: now,
            expires_at: now + self.ttl,
        };
        match self.messages.entry(id) {
            Entry::Occupied(entry) if !entry.get().is_expired(now) => {
                return Err(RelayError::Duplicate(entry.key().clone()));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(message);
            }
            Entry::Vacant(entry) => {
                entry.insert(message);
            }
        }
        Ok(())
    }

    /// Remove and return a message
    pub fn take(&self, id: &MessageId) -> Result<Vec<u8>> {
        let now = Utc::now();
        match self.messages.remove_if(id, |_, message| !message.is_expired(now)) {
            Some((_, message)) => Ok(message.payload),
            None => Err(RelayError::NotFound(id.clone())),
        }
    }

    /// Check if a live message exists
    pub fn exists(&self, id: &MessageId) -> bool {
        let now = Utc::now();
        self.messages
            .get(id)
            .is_some_and(|message| !message.is_expired(now))
    }

    /// Remove expired messages, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let before = self.messages.len();
        self.messages.retain(|_, message| !message.is_expired(now));
        let removed = before.saturating_sub(self.messages.len());
        if removed > 0 {
            debug!(removed, "Swept expired messages");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(3600) // 1 hour default TTL
    }
}
