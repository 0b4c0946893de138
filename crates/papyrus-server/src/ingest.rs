//! 文档上传处理：提取 → 提交 → 落盘
//!
//! 提取成功后才提交文档记录；原始字节落盘是独立的尽力而为步骤，
//! 失败只记录警告，不影响本次上传结果。

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use papyrus_core::DocumentInfo;
use papyrus_document::{ExtractError, TextExtractor, UploadStorage};
use thiserror::Error;
use tracing::{info, warn};

use crate::chat_service::{ChatError, ChatService};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("{0}")]
    Commit(#[from] ChatError),
}

/// 一次成功上传的结果
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document: DocumentInfo,
    pub extracted_chars: usize,
    /// 落盘路径；未启用或失败时为 None
    pub stored_at: Option<PathBuf>,
}

pub struct DocumentIngestor {
    chat: Arc<ChatService>,
    extractor: Arc<dyn TextExtractor>,
    storage: Option<UploadStorage>,
}

impl DocumentIngestor {
    pub fn new(
        chat: Arc<ChatService>,
        extractor: Arc<dyn TextExtractor>,
        storage: Option<UploadStorage>,
    ) -> Self {
        Self {
            chat,
            extractor,
            storage,
        }
    }

    pub async fn ingest(
        &self,
        session_id: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<IngestOutcome, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let data = bytes.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&data))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))??;

        let extracted_chars = text.chars().count();
        let document = self.chat.add_document(session_id, filename, text).await?;

        let stored_at = match &self.storage {
            Some(storage) => match storage.save(session_id, filename, &bytes).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(
                        "Session {}: failed to persist upload {}: {}",
                        session_id, filename, e
                    );
                    None
                }
            },
            None => None,
        };

        info!(
            "Session {}: ingested {} ({} bytes, {} chars extracted)",
            session_id,
            filename,
            bytes.len(),
            extracted_chars
        );

        Ok(IngestOutcome {
            document,
            extracted_chars,
            stored_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papyrus_core::{ChatRequest, ChatResponse};
    use papyrus_document::ExtractResult;
    use papyrus_llm::{LLMError, LLMProvider, ProviderMetadata};
    use papyrus_session::SessionStore;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NoProvider(ProviderMetadata);

    #[async_trait]
    impl LLMProvider for NoProvider {
        fn provider_id(&self) -> &str {
            "none"
        }

        fn metadata(&self) -> &ProviderMetadata {
            &self.0
        }

        async fn chat(&self, _request: ChatRequest) -> papyrus_llm::Result<ChatResponse> {
            Err(LLMError::Config("not used".to_string()))
        }

        async fn validate(&self) -> papyrus_llm::Result<()> {
            Ok(())
        }
    }

    struct FixedExtractor(Option<&'static str>);

    impl TextExtractor for FixedExtractor {
        fn extract_pages(&self, _bytes: &[u8]) -> ExtractResult<Vec<String>> {
            match self.0 {
                Some(text) => Ok(vec![text.to_string()]),
                None => Err(ExtractError::Parse("broken xref".to_string())),
            }
        }
    }

    fn chat_service() -> Arc<ChatService> {
        let provider = Arc::new(NoProvider(ProviderMetadata {
            id: "none".to_string(),
            name: "None".to_string(),
        }));
        Arc::new(ChatService::new(
            Arc::new(SessionStore::default()),
            provider,
            "m",
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_ingest_commits_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let chat = chat_service();
        let ingestor = DocumentIngestor::new(
            Arc::clone(&chat),
            Arc::new(FixedExtractor(Some("Q3 revenue: $5M"))),
            Some(UploadStorage::new(temp_dir.path())),
        );

        let outcome = ingestor
            .ingest("t2", "report.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(outcome.document.filename, "report.pdf");
        assert_eq!(outcome.extracted_chars, 15);
        assert_eq!(outcome.stored_at, Some(temp_dir.path().join("t2").join("report.pdf")));

        let session = chat.store().snapshot("t2").await.unwrap();
        assert_eq!(session.documents[0].extracted_text, "Q3 revenue: $5M");
    }

    #[tokio::test]
    async fn test_extraction_failure_commits_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let chat = chat_service();
        let ingestor = DocumentIngestor::new(
            Arc::clone(&chat),
            Arc::new(FixedExtractor(None)),
            Some(UploadStorage::new(temp_dir.path())),
        );

        let err = ingestor
            .ingest("t2", "broken.pdf", Bytes::from_static(b"%PDF-"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Extract(_)));
        assert!(chat.list_documents("t2").await.is_empty());
        assert!(!temp_dir.path().join("t2").join("broken.pdf").exists());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_ingest() {
        let temp_dir = TempDir::new().unwrap();
        // 以普通文件占住根目录，使落盘必然失败
        let blocked_root = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocked_root, b"").unwrap();

        let chat = chat_service();
        let ingestor = DocumentIngestor::new(
            Arc::clone(&chat),
            Arc::new(FixedExtractor(Some("text"))),
            Some(UploadStorage::new(&blocked_root)),
        );

        let outcome = ingestor
            .ingest("t2", "report.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        assert!(outcome.stored_at.is_none());
        assert_eq!(chat.list_documents("t2").await.len(), 1);
    }
}
