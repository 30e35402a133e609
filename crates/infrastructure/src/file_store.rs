use std::path::{Component, Path, PathBuf};

use application::FileStore;
use async_trait::async_trait;
use domain::RepositoryError;

/// 本地目录文件存储，`/files` 静态服务读取同一目录
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf, RepositoryError> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(file_name)),
            _ => Err(RepositoryError::storage(format!(
                "refusing to store outside upload dir: {file_name}"
            ))),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        let path = self.path_for(file_name)?;
        self.ensure_root()
            .await
            .map_err(|err| RepositoryError::storage(err.to_string()))?;
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "写入上传文件失败");
            RepositoryError::storage(err.to_string())
        })
    }
}
