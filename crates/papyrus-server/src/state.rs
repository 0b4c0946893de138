use std::sync::Arc;
use std::time::Duration;

use papyrus_config::{AuthSettings, Config};
use papyrus_core::ChatOptions;
use papyrus_document::{PdfExtractor, TextExtractor, UploadStorage};
use papyrus_llm::{LLMProvider, OpenAiProvider, ProviderConfig};
use papyrus_session::{SessionStore, SessionStoreConfig};

use crate::chat_service::ChatService;
use crate::ingest::DocumentIngestor;

/// 请求处理器共享的应用状态
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub ingestor: DocumentIngestor,
    /// 单文件上传上限（字节）
    pub max_upload_bytes: u64,
    pub cors: bool,
}

impl AppState {
    /// 由已构建好的组件组装（测试中注入桩实现）
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn LLMProvider>,
        extractor: Arc<dyn TextExtractor>,
        storage: Option<UploadStorage>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::assemble(ChatService::new(store, provider, model, timeout), extractor, storage)
    }

    fn assemble(
        chat: ChatService,
        extractor: Arc<dyn TextExtractor>,
        storage: Option<UploadStorage>,
    ) -> Self {
        let chat = Arc::new(chat);
        let ingestor = DocumentIngestor::new(Arc::clone(&chat), extractor, storage);

        Self {
            chat,
            ingestor,
            max_upload_bytes: papyrus_config::DEFAULT_MAX_UPLOAD_BYTES,
            cors: true,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    /// 由配置构建生产环境状态
    ///
    /// `api_key` 为 `Config::resolve_api_key` 的结果。
    pub fn from_config(config: &Config, api_key: Option<String>) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.llm.timeout_seconds);

        let mut provider_config = ProviderConfig::new("openai", config.llm.base_url.clone())
            .with_model(config.llm.model.clone())
            .with_timeout(timeout)
            .with_max_retries(config.llm.max_retries);
        provider_config = match (&config.llm.auth, api_key) {
            (AuthSettings::ApiKey { .. }, Some(key)) => provider_config.with_api_key(key),
            (AuthSettings::Bearer { .. }, Some(token)) => provider_config.with_bearer_token(token),
            (AuthSettings::None, _) => provider_config,
            (_, None) => anyhow::bail!("LLM credential was not resolved"),
        };
        let provider: Arc<dyn LLMProvider> = Arc::new(OpenAiProvider::with_config(provider_config)?);

        let store = Arc::new(SessionStore::new(
            SessionStoreConfig::default()
                .with_idle_ttl(config.session.idle_ttl_secs)
                .with_cleanup_interval(config.session.cleanup_interval_secs)
                .with_max_sessions(config.session.max_sessions),
        ));

        let storage = if config.storage.persist_uploads {
            let root = papyrus_config::expand_tilde(&config.storage.upload_dir)
                .unwrap_or_else(|| config.storage.upload_dir.clone().into());
            Some(UploadStorage::new(root))
        } else {
            None
        };

        let mut options = ChatOptions::default();
        if let Some(temperature) = config.llm.temperature {
            options = options.with_temperature(temperature);
        }
        if let Some(max_tokens) = config.llm.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        let chat = ChatService::new(store, provider, config.llm.model.clone(), timeout)
            .with_options(options);

        Ok(Self::assemble(chat, Arc::new(PdfExtractor::new()), storage)
            .with_max_upload_bytes(config.server.max_upload_bytes)
            .with_cors(config.server.cors))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.chat.store()
    }
}
