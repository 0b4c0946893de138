//! 上传文档处理
//!
//! - `TextExtractor`：文件字节 → 按页提取的文本（尽力而为）
//! - `UploadStorage`：原始字节按会话落盘，与提取互相独立

pub mod error;
pub mod extractor;
pub mod storage;

pub use error::{ExtractError, ExtractResult, StorageError, StorageResult};
pub use extractor::{PdfExtractor, TextExtractor};
pub use storage::UploadStorage;
