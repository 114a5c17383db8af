use std::borrow::Cow;

use crate::agent_engine::history::prune_screenshots;
use crate::llm::types::ChatMessage;

/// Append-only log of every turn in a run. Requests are built from
/// [`Conversation::compacted`], never from the raw log.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    /// Seeds the log with the system prompt and the task.
    pub fn new(system_prompt: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatMessage::system(system_prompt), ChatMessage::user_text(task)],
        }
    }

    pub fn push(&mut self, turn: ChatMessage) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The view sent to the endpoint: only the newest `keep_last` screenshots keep their image.
    pub fn compacted(&self, keep_last: usize) -> Cow<'_, [ChatMessage]> {
        prune_screenshots(&self.turns, keep_last)
    }
}
