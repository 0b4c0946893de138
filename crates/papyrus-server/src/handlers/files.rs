//! Files Handler - 上传、列出、清空会话文档

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use papyrus_core::DocumentInfo;
use serde::Serialize;

use super::chat::DEFAULT_SESSION_ID;
use crate::error::ApiError;
use crate::state::AppState;

/// 上传成功响应
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub filename: String,
    pub session_id: String,
}

/// 文档列表响应
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<DocumentInfo>,
}

/// 清空结果
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub status: &'static str,
    pub message: String,
}

struct UploadForm {
    filename: String,
    bytes: Bytes,
    session_id: String,
}

/// 读取 multipart 表单：`file` 为必填文件字段，`session_id` 可选
async fn read_upload_form(multipart: &mut Multipart, limit: u64) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, limit))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("File part has no filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit))?;
                if bytes.len() as u64 > limit {
                    return Err(ApiError::PayloadTooLarge { limit });
                }
                file = Some((filename, bytes));
            }
            Some("session_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit))?;
                session_id = Some(value);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    Ok(UploadForm {
        filename,
        bytes,
        session_id: session_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
    })
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_upload_form(&mut multipart, state.max_upload_bytes).await?;

    let outcome = state
        .ingestor
        .ingest(&form.session_id, &form.filename, form.bytes)
        .await?;

    Ok(Json(UploadResponse {
        status: "success",
        message: format!("File {} uploaded and processed.", outcome.document.filename),
        filename: outcome.document.filename,
        session_id: form.session_id,
    }))
}

pub async fn list_files_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<FileListResponse> {
    Json(FileListResponse {
        files: state.chat.list_documents(&session_id).await,
    })
}

pub async fn clear_files_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    state.chat.clear_documents(&session_id).await;
    Json(ClearResponse {
        status: "success",
        message: format!("All files cleared for session {}", session_id),
    })
}
