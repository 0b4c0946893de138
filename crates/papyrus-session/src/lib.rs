//! # Papyrus Session Store
//!
//! 会话状态只保存在进程内存中，按客户端提供的 `session_id` 索引。
//!
//! ## 功能特性
//!
//! - **隐式创建**：首次引用即创建，未知会话的读取视为空会话
//! - **会话级串行**：同一会话的操作通过会话锁串行，不同会话并行
//! - **自动清理**：空闲过期 + 容量上限淘汰
//! - **提示词组装**：系统消息 + 文档文本 + 对话历史
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use papyrus_session::{SessionStore, SessionStoreConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> papyrus_session::SessionResult<()> {
//! let store = Arc::new(SessionStore::new(SessionStoreConfig::default()));
//! let _cleanup = store.spawn_cleanup();
//!
//! let mut session = store.lock("default").await?;
//! session.push_user("Hello!");
//! let prompt = session.prompt_messages();
//! # let _ = prompt;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod store;
pub mod types;

// 重新导出主要类型
pub use error::{SessionError, SessionResult};
pub use store::{SessionGuard, SessionStore, SessionStoreConfig};
pub use types::{Session, BASE_SYSTEM_PROMPT};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
