mod memory;

pub use memory::{ SessionStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION };

use crate::models::chat::{ ChatMessage, Role };
use log::debug;

pub const DEFAULT_MAX_HISTORY: usize = 3;

/// Ordered, bounded conversation: one leading system message followed by the
/// user/assistant turns that survived pruning.
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    system_prompt: ChatMessage,
    messages: Vec<ChatMessage>,
    max_history: usize,
}

impl ConversationHistory {
    pub fn new(system_prompt: impl Into<String>, max_history: usize) -> Self {
        let system_prompt = ChatMessage::system(system_prompt);
        Self {
            messages: vec![system_prompt.clone()],
            system_prompt,
            max_history: max_history.max(1),
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Keeps the system message plus everything from the oldest of the last
    /// `max_history` user messages onward. A trailing unanswered user message
    /// counts like any other.
    pub fn prune(&mut self) {
        debug_assert!(
            self.messages.first().map(|m| m.role) == Some(Role::System),
            "conversation history lost its system message"
        );

        let user_indices: Vec<usize> = self.messages
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        if user_indices.len() <= self.max_history {
            return;
        }

        let keep_from = user_indices[user_indices.len() - self.max_history];
        let mut pruned = Vec::with_capacity(self.messages.len() - keep_from + 1);
        pruned.push(self.system_prompt.clone());
        pruned.extend(self.messages.drain(keep_from..));
        self.messages = pruned;
        debug!("Pruned conversation history to keep last {} user messages.", self.max_history);
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(self.system_prompt.clone());
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}
