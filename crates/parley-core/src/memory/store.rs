//! Conversation memory store
//!
//! Bounded per-(user, persona) history that expires after a period of inactivity.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use parley_ai::Message;
use tracing::debug;

/// Identifies one memory thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub identity: String,
    pub persona: String,
}

impl ConversationKey {
    pub fn new(identity: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            persona: persona.into(),
        }
    }
}

#[derive(Default)]
struct MemoryInner {
    conversations: HashMap<ConversationKey, VecDeque<Message>>,
    last_activity: HashMap<ConversationKey, Instant>,
}

impl MemoryInner {
    /// Both maps always hold the same key set.
    fn sweep(&mut self, now: Instant, expiry: Duration) -> usize {
        let expired: Vec<ConversationKey> = self
            .last_activity
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) > expiry)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.conversations.remove(key);
            self.last_activity.remove(key);
        }
        expired.len()
    }
}

/// Bounded, expiring conversation history.
///
/// One coarse lock guards both maps, so sweeps and touches from tasks
/// serving different personas never interleave.
pub struct MemoryStore {
    capacity: usize,
    expiry: Duration,
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// `max_turns` counts user/assistant pairs; storage holds twice as many messages.
    pub fn new(max_turns: usize, expiry: Duration) -> Self {
        Self {
            capacity: max_turns * 2,
            expiry,
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// Maximum number of messages kept per conversation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sweep expired conversations, then record activity for `key`.
    pub fn touch(&self, key: &ConversationKey) {
        self.touch_at(key, Instant::now());
    }

    pub fn touch_at(&self, key: &ConversationKey, now: Instant) {
        let mut inner = self.inner.lock();
        let removed = inner.sweep(now, self.expiry);
        if removed > 0 {
            debug!("Expired {} idle conversation(s)", removed);
        }
        inner.last_activity.insert(key.clone(), now);
        inner.conversations.entry(key.clone()).or_default();
    }

    /// Remove every conversation idle for longer than the expiry window.
    pub fn sweep_at(&self, now: Instant) -> usize {
        self.inner.lock().sweep(now, self.expiry)
    }

    /// Ordered history for `key`, oldest first. Empty when unknown.
    pub fn get(&self, key: &ConversationKey) -> Vec<Message> {
        self.inner
            .lock()
            .conversations
            .get(key)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Commit one exchange, evicting the oldest messages past capacity.
    pub fn append(&self, key: &ConversationKey, user: Message, assistant: Message) {
        let mut inner = self.inner.lock();
        inner
            .last_activity
            .entry(key.clone())
            .or_insert_with(Instant::now);

        let turns = inner.conversations.entry(key.clone()).or_default();
        turns.push_back(user);
        turns.push_back(assistant);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    /// Forget every conversation of `identity`.
    ///
    /// Returns how many of the removed conversations held turns; entries
    /// recorded by a touch alone are dropped without being counted.
    pub fn clear_all(&self, identity: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<ConversationKey> = inner
            .last_activity
            .keys()
            .filter(|key| key.identity == identity)
            .cloned()
            .collect();

        let mut cleared = 0;
        for key in &keys {
            if inner
                .conversations
                .remove(key)
                .is_some_and(|turns| !turns.is_empty())
            {
                cleared += 1;
            }
            inner.last_activity.remove(key);
        }
        cleared
    }

    /// Whether `key` currently has an activity record.
    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.inner.lock().last_activity.contains_key(key)
    }

    /// Number of tracked conversations.
    pub fn len(&self) -> usize {
        self.inner.lock().last_activity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
