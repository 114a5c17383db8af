use async_trait::async_trait;

use crate::config::EndpointConfig;
use crate::errors::{PilotError, PilotResult};
use crate::llm::provider::ChatEndpoint;
use crate::llm::types::{AssistantMessage, ChatCompletion, ChatMessage, ChatRequest, ToolDef};

pub struct OpenAiCompatibleEndpoint {
    url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleEndpoint {
    pub fn from_config(cfg: &EndpointConfig) -> PilotResult<Self> {
        let client = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            url: cfg.url.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            api_key: cfg.resolved_api_key(),
            client,
        })
    }
}

#[async_trait]
impl ChatEndpoint for OpenAiCompatibleEndpoint {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
    ) -> PilotResult<AssistantMessage> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice: "auto",
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            "sending chat request"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                body = %sanitized_body(&request),
                "request body (sanitized, base64 omitted)"
            );
        }

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(PilotError::Endpoint(format!("{}: {}", status, err_body)));
        }

        let text = response.text().await?;
        let completion: ChatCompletion = serde_json::from_str(&text)
            .map_err(|e| PilotError::MalformedResponse(format!("{e}")))?;
        let message = completion.into_first_message().ok_or_else(|| {
            PilotError::MalformedResponse("response has no choices[0].message".into())
        })?;

        tracing::info!(
            content_len = message.text().map(str::len).unwrap_or(0),
            tool_calls = message.tool_calls().len(),
            tools = ?message.tool_calls().iter().map(|tc| tc.function.name.as_str()).collect::<Vec<_>>(),
            "chat response received"
        );
        Ok(message)
    }
}

/// Serializes the request with every image data URI replaced, for logging only.
fn sanitized_body(request: &ChatRequest<'_>) -> String {
    let mut log_body = match serde_json::to_value(request) {
        Ok(v) => v,
        Err(e) => return format!("<unserializable request: {e}>"),
    };
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            // content can be string or array of parts; only the array case carries images.
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) == Some("image_url") {
                    if let Some(url) = part.pointer_mut("/image_url/url") {
                        *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                    }
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tools::load_builtin_tools;

    #[test]
    fn request_body_has_the_wire_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user_text("task")];
        let tools = load_builtin_tools().unwrap();
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: &tools,
            tool_choice: "auto",
            temperature: 0.0,
            max_tokens: 64,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["model"], "m");
        assert_eq!(v["tool_choice"], "auto");
        assert_eq!(v["max_tokens"], 64);
        assert_eq!(v["messages"].as_array().unwrap().len(), 2);
        assert_eq!(v["tools"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn sanitized_body_hides_image_payloads() {
        let messages = vec![ChatMessage::screenshot(&[0u8; 64])];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: &[],
            tool_choice: "auto",
            temperature: 0.0,
            max_tokens: 1,
        };
        let body = sanitized_body(&request);
        assert!(body.contains("<omitted_base64_image>"));
        assert!(!body.contains("base64,"));
    }
}
