use papyrus_core::chat::{ChatRequest, ChatResponse, ChatUsage, FinishReason};
use papyrus_core::types::{Message, Role};
use serde_json::{json, Value};

use crate::error::ConversionError;
use crate::transformer::SchemaTransformer;

/// OpenAI-compatible schema transformer
/// Works with OpenAI API, Azure OpenAI, and compatible providers
#[derive(Debug, Default)]
pub struct OpenAiTransformer;

impl OpenAiTransformer {
    /// Create a new OpenAI transformer
    pub fn new() -> Self {
        Self
    }

    /// Convert internal Message to OpenAI format
    fn convert_message(&self, msg: &Message) -> Value {
        json!({
            "role": msg.role.to_string(),
            "content": msg.content,
        })
    }

    /// Convert finish reason string to enum
    fn convert_finish_reason(&self, reason: Option<&str>) -> FinishReason {
        match reason {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }

    fn convert_role(&self, role: Option<&str>) -> Role {
        match role {
            Some("system") => Role::System,
            Some("user") => Role::User,
            _ => Role::Assistant,
        }
    }
}

impl SchemaTransformer for OpenAiTransformer {
    fn provider_id(&self) -> &str {
        "openai"
    }

    fn transform_request(&self, request: &ChatRequest) -> Result<Value, ConversionError> {
        if request.model.is_empty() {
            return Err(ConversionError::MissingField("model".to_string()));
        }

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| self.convert_message(m))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
        });

        if let Some(temp) = request.options.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = request.options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        Ok(body)
    }

    fn parse_response(&self, data: &Value) -> Result<ChatResponse, ConversionError> {
        let id = data["id"].as_str().unwrap_or_default().to_string();
        let model = data["model"].as_str().unwrap_or_default().to_string();

        let choice = data["choices"]
            .get(0)
            .ok_or_else(|| ConversionError::MissingField("choices".to_string()))?;

        let message_data = choice
            .get("message")
            .ok_or_else(|| ConversionError::MissingField("choices[0].message".to_string()))?;

        let role = self.convert_role(message_data["role"].as_str());

        let content = match message_data.get("content") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => {
                return Err(ConversionError::MissingField(
                    "choices[0].message.content".to_string(),
                ))
            }
            Some(other) => {
                return Err(ConversionError::InvalidFormat(format!(
                    "message content is not a string: {}",
                    other
                )))
            }
        };

        let usage_data = data.get("usage");
        let usage = ChatUsage {
            input_tokens: usage_data
                .and_then(|u| u["prompt_tokens"].as_u64())
                .unwrap_or(0) as u32,
            output_tokens: usage_data
                .and_then(|u| u["completion_tokens"].as_u64())
                .unwrap_or(0) as u32,
            total_tokens: usage_data
                .and_then(|u| u["total_tokens"].as_u64())
                .unwrap_or(0) as u32,
        };

        let finish_reason = self.convert_finish_reason(choice["finish_reason"].as_str());

        Ok(ChatResponse::new(id, model, Message::new(role, content))
            .with_usage(usage)
            .with_finish_reason(finish_reason))
    }
}
