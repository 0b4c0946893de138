//! # Session Error Types

use thiserror::Error;

/// 会话存储错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 会话数已达上限，且所有会话都在使用中，无法淘汰
    #[error("Session capacity exceeded: {limit} sessions are all in use")]
    CapacityExceeded { limit: usize },
}

/// 会话结果类型
pub type SessionResult<T> = Result<T, SessionError>;
