use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// 上传原始字节的落盘存储
///
/// 布局：`<root>/<session_id>/<filename>`，同名文件覆盖。
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 计算落盘路径，不触碰文件系统
    pub fn path_for(&self, session_id: &str, filename: &str) -> StorageResult<PathBuf> {
        let session_dir = sanitize_component(session_id)?;
        let file_name = sanitize_component(filename)?;
        Ok(self.root.join(session_dir).join(file_name))
    }

    /// 保存上传文件，返回写入路径
    pub async fn save(&self, session_id: &str, filename: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let path = self.path_for(session_id, filename)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(path)
    }
}

/// 将客户端提供的名字收敛为单个安全的路径分量
fn sanitize_component(raw: &str) -> StorageResult<String> {
    let normalized = raw.replace('\\', "/");
    let name = normalized
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_component("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_component("C:\\Users\\me\\q3.pdf").unwrap(), "q3.pdf");
        assert!(sanitize_component("..").is_err());
        assert!(sanitize_component("dir/").is_err());
        assert!(sanitize_component("").is_err());
    }

    #[tokio::test]
    async fn test_save_under_session_dir() {
        let temp_dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(temp_dir.path());

        let path = storage.save("t2", "report.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(path, temp_dir.path().join("t2").join("report.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_save_cannot_escape_root() {
        let temp_dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(temp_dir.path().join("uploads"));

        let path = storage.save("../outside", "../../x.pdf", b"data").await.unwrap();

        assert!(path.starts_with(temp_dir.path().join("uploads")));
        assert_eq!(path.file_name().unwrap(), "x.pdf");
    }
}
