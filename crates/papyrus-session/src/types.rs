//! # Session Types
//!
//! 单个会话的状态：对话历史 + 已上传文档，以及提示词组装。

use chrono::{DateTime, Utc};
use papyrus_core::{DocumentInfo, DocumentRecord, Message};

/// 没有文档时使用的系统提示词
pub const BASE_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// 会话
///
/// `conversation` 只追加；系统消息每次请求时合成，从不写入历史。
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub conversation: Vec<Message>,
    pub documents: Vec<DocumentRecord>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// 创建空会话
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conversation: Vec::new(),
            documents: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// 追加用户消息
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.conversation.push(Message::user(content));
    }

    /// 追加助手消息
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.conversation.push(Message::assistant(content));
    }

    /// 追加文档记录
    pub fn add_document(&mut self, record: DocumentRecord) {
        self.documents.push(record);
    }

    /// 清空文档（对话历史保留）
    pub fn clear_documents(&mut self) {
        self.documents.clear();
    }

    /// 上传文件列表（按上传顺序）
    pub fn document_infos(&self) -> Vec<DocumentInfo> {
        self.documents.iter().map(DocumentRecord::info).collect()
    }

    /// 合成系统提示词
    ///
    /// 有文档时列出文件名，并按上传顺序以空行拼接全部文档文本。
    pub fn system_prompt(&self) -> String {
        if self.documents.is_empty() {
            return BASE_SYSTEM_PROMPT.to_string();
        }

        let file_names: Vec<&str> = self.documents.iter().map(|d| d.filename.as_str()).collect();
        let all_docs_text: Vec<&str> = self
            .documents
            .iter()
            .map(|d| d.extracted_text.as_str())
            .collect();

        format!(
            "{} You have access to these uploaded files: {}. Use the following document content to answer questions: {}",
            BASE_SYSTEM_PROMPT,
            file_names.join(", "),
            all_docs_text.join("\n\n")
        )
    }

    /// 发送给补全接口的消息列表：系统消息 + 完整对话历史
    pub fn prompt_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        messages.push(Message::system(self.system_prompt()));
        messages.extend(self.conversation.iter().cloned());
        messages
    }
}
