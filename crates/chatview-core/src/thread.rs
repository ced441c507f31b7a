//! The in-memory conversation thread.
//!
//! Messages live only for the lifetime of the process; nothing here is
//! persisted.

use crate::message::Message;
use crate::model::AiModel;
use crate::provider::Turn;

#[derive(Debug, Clone, Default)]
pub struct MessageThread {
    messages: Vec<Message>,
}

impl MessageThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Drop every message ("new chat").
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The last `limit` text messages exchanged with `model`, oldest first.
    ///
    /// Image replies and messages for other models are skipped so that a
    /// completion never sees DALL·E URLs as conversation context.
    pub fn recent_turns(&self, model: AiModel, limit: usize) -> Vec<Turn> {
        if limit == 0 {
            return Vec::new();
        }
        let mut turns: Vec<Turn> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.selected == model && !m.is_image())
            .take(limit)
            .map(|m| Turn {
                ai: m.ai,
                text: m.text.clone(),
            })
            .collect();
        turns.reverse();
        turns
    }
}
