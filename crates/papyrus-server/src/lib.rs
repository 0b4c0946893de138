//! Papyrus Server - 带 PDF 文档上下文的聊天代理
//!
//! 会话状态保存在内存中；`/upload` 提取 PDF 文本并附加到会话，
//! `/chat` 将文档内容拼入系统提示后调用补全接口。

pub mod chat_service;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod logging;
pub mod server;
pub mod state;

pub use chat_service::{ChatError, ChatService};
pub use error::ApiError;
pub use ingest::{DocumentIngestor, IngestError, IngestOutcome};
pub use server::{create_router, run_server};
pub use state::AppState;
