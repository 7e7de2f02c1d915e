use super::ConversationHistory;
use log::{ debug, info };
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_SESSION: &str = "default";
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct SessionEntry {
    history: Arc<Mutex<ConversationHistory>>,
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drops the least recently used session other than `default`.
    fn evict_one(&mut self) -> bool {
        let oldest = self.entries
            .iter()
            .filter(|(id, _)| id.as_str() != DEFAULT_SESSION)
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());

        match oldest {
            Some(id) => {
                self.entries.remove(&id);
                debug!("Evicted conversation for session '{}'", id);
                true
            }
            None => false,
        }
    }
}

/// In-process conversation store keyed by session id. Each history has its own
/// lock so a whole chat turn can run while holding it. At most `max_sessions`
/// histories are kept, `default` included; the least recently used one goes first.
pub struct SessionStore {
    system_prompt: String,
    max_history: usize,
    max_sessions: usize,
    sessions: Mutex<Sessions>,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>, max_history: usize, max_sessions: usize) -> Self {
        let system_prompt = system_prompt.into();
        let max_sessions = max_sessions.max(2);
        let mut sessions = Sessions::default();
        let last_used = sessions.tick();
        sessions.entries.insert(DEFAULT_SESSION.to_string(), SessionEntry {
            history: Arc::new(
                Mutex::new(ConversationHistory::new(system_prompt.clone(), max_history))
            ),
            last_used,
        });
        info!(
            "Conversation store ready (max history: {} user turns, max sessions: {})",
            max_history,
            max_sessions
        );
        Self {
            system_prompt,
            max_history,
            max_sessions,
            sessions: Mutex::new(sessions),
        }
    }

    /// Returns the history for `session_id`, creating it when unknown.
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationHistory>> {
        let mut sessions = self.sessions.lock().await;
        let now = sessions.tick();

        if let Some(entry) = sessions.entries.get_mut(session_id) {
            entry.last_used = now;
            return entry.history.clone();
        }

        while sessions.entries.len() >= self.max_sessions {
            if !sessions.evict_one() {
                break;
            }
        }

        debug!("Creating conversation for session '{}'", session_id);
        let history = Arc::new(
            Mutex::new(ConversationHistory::new(self.system_prompt.clone(), self.max_history))
        );
        sessions.entries.insert(session_id.to_string(), SessionEntry {
            history: history.clone(),
            last_used: now,
        });
        history
    }

    /// Unknown sessions are left alone: there is nothing to clear.
    pub async fn reset(&self, session_id: &str) {
        let history = {
            let sessions = self.sessions.lock().await;
            match sessions.entries.get(session_id) {
                Some(entry) => entry.history.clone(),
                None => {
                    debug!("Reset for unknown session '{}' ignored.", session_id);
                    return;
                }
            }
        };
        history.lock().await.reset();
        debug!("Conversation history for session '{}' has been reset.", session_id);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}
