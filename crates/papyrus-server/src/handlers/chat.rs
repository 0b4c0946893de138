//! Chat Handler - 单轮对话

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

pub const DEFAULT_SESSION_ID: &str = "default";

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

/// 聊天请求
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// 客户端提示字段，服务端不使用
    #[serde(default)]
    pub has_file: bool,
}

/// 聊天响应
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    tracing::debug!(
        "Chat request for session {} (has_file hint: {})",
        request.session_id,
        request.has_file
    );

    let response = state
        .chat
        .respond(&request.session_id, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        response,
        session_id: request.session_id,
    }))
}
