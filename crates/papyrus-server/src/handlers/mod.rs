//! HTTP 请求处理器

pub mod chat;
pub mod files;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// 存活检查
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Backend is running",
    })
}
