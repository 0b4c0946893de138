use thiserror::Error;

/// 文本提取错误
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("not a PDF document")]
    UnsupportedType,

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("extraction task failed: {0}")]
    Task(String),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// 上传文件存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
