//! Process-wide session state

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::memory::MemoryStore;

/// Shared state behind every generation: conversation memory, one lock per
/// persona and the set of personas currently generating.
///
/// Created once at startup and injected into the coordinator.
pub struct SessionState {
    memory: MemoryStore,
    /// Persona locks are never removed; personas are fixed at startup.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Personas whose generation flag is set. Only mutated while holding
    /// that persona's lock.
    generating: Mutex<HashSet<String>>,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            memory: MemoryStore::new(config.max_turns, config.memory_expiry),
            locks: Mutex::new(HashMap::new()),
            generating: Mutex::new(HashSet::new()),
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Lock for `persona`, created on first reference.
    pub fn persona_lock(&self, persona: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(persona.to_string())
            .or_default()
            .clone()
    }

    pub fn is_generating(&self, persona: &str) -> bool {
        self.generating.lock().contains(persona)
    }

    pub fn set_generating(&self, persona: &str, generating: bool) {
        let mut set = self.generating.lock();
        if generating {
            set.insert(persona.to_string());
        } else {
            set.remove(persona);
        }
    }

    /// Whether any persona is generating.
    pub fn any_generating(&self) -> bool {
        !self.generating.lock().is_empty()
    }
}
