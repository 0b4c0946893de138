//! Chat Service - 会话状态与补全调用的编排
//!
//! 每个操作都在会话锁内完成：同一会话串行，不同会话并行。
//! 补全调用期间持有会话锁；超时预算同时覆盖等锁与补全调用。

use std::sync::Arc;
use std::time::Duration;

use papyrus_core::{ChatOptions, ChatRequest, DocumentInfo, DocumentRecord};
use papyrus_llm::{LLMError, LLMProvider};
use papyrus_session::{SessionError, SessionStore};
use thiserror::Error;
use tracing::{debug, error, info};

/// 聊天失败原因
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Llm(#[from] LLMError),

    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion returned an empty response")]
    EmptyResponse,
}

/// 聊天编排器
pub struct ChatService {
    store: Arc<SessionStore>,
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: ChatOptions,
    timeout: Duration,
}

impl ChatService {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            options: ChatOptions::default(),
            timeout,
        }
    }

    /// 每次补全请求附带的采样参数
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// 启动时检查补全服务配置
    pub async fn validate_provider(&self) -> Result<(), ChatError> {
        let metadata = self.provider.metadata();
        self.provider.validate().await?;
        info!("Provider {} ({}) ready, model {}", metadata.name, metadata.id, self.model);
        Ok(())
    }

    /// 处理一轮对话
    ///
    /// 用户消息先写入历史；补全失败时历史中保留这条未回复的用户消息，
    /// 不追加任何助手消息。等锁超时则历史不变。
    pub async fn respond(&self, session_id: &str, user_message: &str) -> Result<String, ChatError> {
        match tokio::time::timeout(self.timeout, self.run_turn(session_id, user_message)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Session {}: turn timed out after {:?}", session_id, self.timeout);
                Err(ChatError::Timeout(self.timeout))
            }
        }
    }

    async fn run_turn(&self, session_id: &str, user_message: &str) -> Result<String, ChatError> {
        let mut session = self.store.lock(session_id).await?;
        session.push_user(user_message);

        let request = ChatRequest::new(self.model.as_str())
            .with_messages(session.prompt_messages())
            .with_options(self.options.clone());
        debug!(
            "Session {}: sending {} messages ({} documents) to {}",
            session_id,
            request.messages.len(),
            session.documents.len(),
            self.provider.provider_id()
        );

        let response = self.provider.chat(request).await.map_err(|e| {
            error!("Session {}: completion failed: {}", session_id, e);
            ChatError::Llm(e)
        })?;

        let reply = response.text().trim().to_string();
        if reply.is_empty() {
            error!("Session {}: completion returned empty text", session_id);
            return Err(ChatError::EmptyResponse);
        }

        session.push_assistant(reply.clone());
        info!(
            "Session {}: turn complete ({} messages in history, {} tokens)",
            session_id,
            session.conversation.len(),
            response.usage.total_tokens
        );
        Ok(reply)
    }

    /// 追加文档记录
    pub async fn add_document(
        &self,
        session_id: &str,
        filename: &str,
        extracted_text: String,
    ) -> Result<DocumentInfo, ChatError> {
        let record = DocumentRecord::new(filename, extracted_text);
        let info = record.info();

        let mut session = self.store.lock(session_id).await?;
        session.add_document(record);
        info!(
            "Session {}: added document {} ({} documents total)",
            session_id,
            filename,
            session.documents.len()
        );
        Ok(info)
    }

    /// 已上传文档列表，未知会话返回空列表
    pub async fn list_documents(&self, session_id: &str) -> Vec<DocumentInfo> {
        self.store.document_infos(session_id).await
    }

    /// 清空文档，幂等
    pub async fn clear_documents(&self, session_id: &str) {
        let existed = self.store.clear_documents(session_id).await;
        debug!("Session {}: documents cleared (known session: {})", session_id, existed);
    }
}
