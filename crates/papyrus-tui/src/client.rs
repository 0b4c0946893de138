use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(1);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const FILES_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Error: {detail}")]
    Server { status: u16, detail: String },

    #[error("File too large. Maximum size is {}MB.", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Cannot read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
    has_file: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub filename: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    /// Unix 秒
    pub upload_time: f64,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    files: Vec<FileInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// HTTP client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    client: Client,
    /// 须长于服务端一轮对话的超时，否则客户端报错后服务端仍可能写入回复
    chat_timeout: Duration,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            chat_timeout: Duration::from_secs(papyrus_config::DEFAULT_CLIENT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn chat_timeout(&self) -> Duration {
        self.chat_timeout
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub async fn send_message(
        &self,
        message: &str,
        session_id: &str,
        has_file: bool,
    ) -> ClientResult<String> {
        let request = ChatRequest {
            message,
            session_id,
            has_file,
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&request)
            .timeout(self.chat_timeout)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let chat: ChatResponse = response.json().await?;
        Ok(chat.response)
    }

    /// 上传文件；超过 `max_bytes` 的文件在发送前即被拒绝
    pub async fn upload_file(
        &self,
        path: &Path,
        session_id: &str,
        max_bytes: u64,
    ) -> ClientResult<UploadResponse> {
        let io_error = |source| ClientError::Io {
            path: path.display().to_string(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        if size > max_bytes {
            return Err(ClientError::FileTooLarge {
                size,
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/pdf")?;
        let form = Form::new()
            .part("file", part)
            .text("session_id", session_id.to_string());

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_files(&self, session_id: &str) -> ClientResult<Vec<FileInfo>> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.base_url, session_id))
            .timeout(FILES_TIMEOUT)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let list: FileListResponse = response.json().await?;
        Ok(list.files)
    }

    pub async fn clear_files(&self, session_id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(format!("{}/files/{}", self.base_url, session_id))
            .timeout(FILES_TIMEOUT)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

/// 非 2xx 响应转换为 `ClientError::Server`，优先取 `detail` 字段
async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| "Unknown error".to_string());

    log::warn!("Backend returned {}: {}", status, detail);
    Err(ClientError::Server {
        status: status.as_u16(),
        detail,
    })
}
