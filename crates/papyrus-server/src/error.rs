//! API 错误类型
//!
//! 所有失败统一为 `{"detail": "<text>"}` 响应体。

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::chat_service::ChatError;
use crate::ingest::IngestError;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 - 请求格式错误（缺少文件字段、multipart 解析失败）
    #[error("{0}")]
    BadRequest(String),

    /// 413 - 上传超过服务端上限
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// 422 - JSON 请求体无法解析
    #[error("{0}")]
    InvalidBody(String),

    /// 500 - 补全失败、超时或响应异常
    #[error("{0}")]
    Chat(#[from] ChatError),

    /// 500 - 提取或提交失败
    #[error("Failed to upload or process file: {0}")]
    Ingest(#[from] IngestError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Chat(_) | ApiError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// multipart 读取失败；超出 body 上限时映射为 413
    pub fn from_multipart(err: MultipartError, limit: u64) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
