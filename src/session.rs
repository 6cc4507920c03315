use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::service::Outcome;

/// The last generation recorded for a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub conversation_id: String,
    pub prompt: String,
    pub outcome: Outcome,
    pub recorded_at: String,
}

/// Per-conversation state, keyed by conversation id. The pipeline makes no
/// assumption about where it lives.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, entry: SessionEntry);

    async fn load(&self, conversation_id: &str) -> Option<SessionEntry>;

    /// Drops everything stored for the conversation. Returns whether
    /// anything was there.
    async fn clear(&self, conversation_id: &str) -> bool;
}

pub const DEFAULT_SESSION_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<String, SessionEntry>,
    // Conversation ids, least recently saved first.
    order: VecDeque<String>,
}

/// Keeps at most `capacity` conversations; saving past that evicts the one
/// saved longest ago.
#[derive(Debug)]
pub struct InMemorySessionStore {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.by_id.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, entry: SessionEntry) {
        let mut entries = self.entries.write().await;
        let id = entry.conversation_id.clone();

        if entries.by_id.insert(id.clone(), entry).is_some() {
            entries.order.retain(|existing| *existing != id);
        }
        entries.order.push_back(id);

        while entries.by_id.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.by_id.remove(&oldest);
            tracing::debug!(conversation_id = %oldest, "evicted session entry");
        }
    }

    async fn load(&self, conversation_id: &str) -> Option<SessionEntry> {
        self.entries.read().await.by_id.get(conversation_id).cloned()
    }

    async fn clear(&self, conversation_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let removed = entries.by_id.remove(conversation_id).is_some();
        if removed {
            entries.order.retain(|existing| existing != conversation_id);
        }
        removed
    }
}
