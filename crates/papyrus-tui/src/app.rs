use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};

use crate::client::{ChatClient, FileInfo};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// 文本消息或文件附件标记
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind {
    Text,
    File,
}

#[derive(Debug, Clone)]
pub struct DisplayMessage {
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Connected"),
            ConnectionStatus::Disconnected => write!(f, "○ Disconnected"),
            ConnectionStatus::Error => write!(f, "✗ Error"),
        }
    }
}

/// 输入行含义：聊天消息或待上传文件路径
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Chat,
    Attach,
}

pub struct App {
    pub client: ChatClient,
    /// 本实例生命周期内固定
    pub session_id: String,
    pub messages: Vec<DisplayMessage>,
    pub uploaded_files: Vec<FileInfo>,
    pub input: String,
    pub input_mode: InputMode,
    pub status: ConnectionStatus,
    pub scroll_offset: usize,
    pub max_file_bytes: u64,
    /// 请求进行中，渲染 "Thinking..." 提示
    pub busy: bool,
}

impl App {
    #[cfg(test)]
    pub fn new(server_url: &str, max_file_bytes: u64) -> Self {
        Self::with_client(ChatClient::new(server_url), max_file_bytes)
    }

    /// 按客户端配置构建
    pub fn from_config(server_url: &str, config: &papyrus_config::ClientConfig) -> Self {
        let client = ChatClient::new(server_url)
            .with_chat_timeout(Duration::from_secs(config.request_timeout_secs));
        Self::with_client(client, config.max_file_bytes)
    }

    fn with_client(client: ChatClient, max_file_bytes: u64) -> Self {
        Self {
            client,
            session_id: format!("session_{}", Utc::now().timestamp()),
            messages: Vec::new(),
            uploaded_files: Vec::new(),
            input: String::new(),
            input_mode: InputMode::Chat,
            status: ConnectionStatus::Disconnected,
            scroll_offset: 0,
            max_file_bytes,
            busy: false,
        }
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub async fn check_connection(&mut self) {
        if self.client.health_check().await {
            self.status = ConnectionStatus::Connected;
            self.refresh_files().await;
        } else {
            self.status = ConnectionStatus::Disconnected;
            self.add_system_message(format!(
                "Cannot connect to backend at {}.",
                self.client.base_url()
            ));
        }
    }

    /// 重新读取服务端文件列表；失败时清空本地缓存
    pub async fn refresh_files(&mut self) {
        match self.client.list_files(&self.session_id).await {
            Ok(files) => self.uploaded_files = files,
            Err(e) => {
                log::warn!("Failed to list files: {}", e);
                self.uploaded_files.clear();
            }
        }
    }

    /// 根据当前输入模式提交输入行
    pub async fn submit(&mut self) {
        let input = self.input.trim().to_string();
        if input.is_empty() {
            return;
        }
        self.input.clear();

        self.busy = true;
        match self.input_mode {
            InputMode::Chat => self.send_message(&input).await,
            InputMode::Attach => self.attach_file(&input).await,
        }
        self.busy = false;
    }

    pub async fn send_message(&mut self, content: &str) {
        self.add_user_message(content, MessageKind::Text);
        self.ask(content, false).await;
    }

    /// 上传文件并请求一条确认回复
    pub async fn attach_file(&mut self, raw_path: &str) {
        self.input_mode = InputMode::Chat;

        let path = papyrus_config::expand_tilde(raw_path).unwrap_or_else(|| PathBuf::from(raw_path));
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw_path.to_string());

        self.add_user_message(&filename, MessageKind::File);

        match self
            .client
            .upload_file(&path, &self.session_id, self.max_file_bytes)
            .await
        {
            Ok(response) => {
                log::info!("{} (session {})", response.message, response.session_id);
                self.status = ConnectionStatus::Connected;
                self.refresh_files().await;
                self.ask(&format!("I've uploaded a file named {}.", response.filename), true)
                    .await;
                self.add_system_message("File uploaded successfully!".to_string());
            }
            Err(e) => {
                self.add_system_message(format!("File upload failed. {}", e));
            }
        }
    }

    async fn ask(&mut self, message: &str, has_file: bool) {
        match self
            .client
            .send_message(message, &self.session_id, has_file)
            .await
        {
            Ok(reply) => {
                self.status = ConnectionStatus::Connected;
                self.add_assistant_message(&reply);
            }
            Err(e) => {
                self.status = match e {
                    crate::client::ClientError::Connection(_) => ConnectionStatus::Disconnected,
                    _ => ConnectionStatus::Error,
                };
                self.add_system_message(e.to_string());
            }
        }
    }

    /// 清空服务端文件，会话历史不变
    pub async fn clear_files(&mut self) {
        match self.client.clear_files(&self.session_id).await {
            Ok(()) => {
                self.uploaded_files.clear();
                self.add_system_message("All files cleared!".to_string());
            }
            Err(e) => {
                self.add_system_message(format!("Failed to clear files. {}", e));
            }
        }
    }

    /// 仅清空本地显示
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.scroll_offset = 0;
    }

    pub fn toggle_attach_mode(&mut self) {
        self.input_mode = match self.input_mode {
            InputMode::Chat => InputMode::Attach,
            InputMode::Attach => InputMode::Chat,
        };
        self.input.clear();
    }

    pub fn push_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(10);
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(10);
    }

    pub fn add_user_message(&mut self, content: &str, kind: MessageKind) {
        self.push_message(MessageRole::User, kind, content.to_string());
    }

    pub fn add_assistant_message(&mut self, content: &str) {
        self.push_message(MessageRole::Assistant, MessageKind::Text, content.to_string());
    }

    pub fn add_system_message(&mut self, content: String) {
        self.push_message(MessageRole::System, MessageKind::Text, content);
    }

    fn push_message(&mut self, role: MessageRole, kind: MessageKind, content: String) {
        self.messages.push(DisplayMessage {
            role,
            kind,
            content,
            timestamp: Local::now(),
        });
        self.scroll_to_bottom();
    }

    /// offset 为距底部的行数
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}
