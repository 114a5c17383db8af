use async_trait::async_trait;

use crate::errors::PilotResult;
use crate::llm::types::{AssistantMessage, ChatMessage, ToolDef};

/// A tool-calling chat endpoint. The engine only talks to this trait, so a
/// scripted implementation can stand in for the HTTP client.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Sends the full message list and tool schema, returning the assistant
    /// message from the first choice. Transport failures are returned as-is;
    /// callers do not retry.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> PilotResult<AssistantMessage>;
}
