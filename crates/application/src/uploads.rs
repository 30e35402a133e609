//! 上传文件：按内容嗅探类型、随机命名后写入文件存储

use std::sync::Arc;

use data_encoding::HEXLOWER;
use domain::DomainError;

use crate::{error::ApplicationError, repository::FileStore};

/// 允许上传的类型（按字节内容检测，而非客户端声明）
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/gif", "image/png", "video/mp4"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub file_name: String,
    pub content_type: String,
    /// 相对地址，形如 `files/<name>`
    pub url: String,
}

pub struct UploadService {
    store: Arc<dyn FileStore>,
    public_prefix: String,
}

impl UploadService {
    pub fn new(store: Arc<dyn FileStore>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into().trim_matches('/').to_owned();
        Self {
            store,
            public_prefix,
        }
    }

    pub async fn upload(&self, bytes: &[u8]) -> Result<StoredUpload, ApplicationError> {
        if bytes.is_empty() {
            return Err(DomainError::invalid_argument("file", "cannot be empty").into());
        }

        let Some(kind) = infer::get(bytes) else {
            tracing::warn!("拒绝无法识别类型的上传");
            return Err(ApplicationError::UnsupportedMediaType { detected: None });
        };
        if !ALLOWED_CONTENT_TYPES.contains(&kind.mime_type()) {
            tracing::warn!(detected = kind.mime_type(), "拒绝不支持的上传类型");
            return Err(ApplicationError::UnsupportedMediaType {
                detected: Some(kind.mime_type().to_owned()),
            });
        }

        let file_name = format!("{}.{}", random_name(), kind.extension());
        self.store.put(&file_name, bytes).await?;

        tracing::info!(file_name = %file_name, content_type = kind.mime_type(), size = bytes.len(), "文件已上传");
        Ok(StoredUpload {
            url: format!("{}/{}", self.public_prefix, file_name),
            content_type: kind.mime_type().to_owned(),
            file_name,
        })
    }
}

/// 32 位十六进制随机名
fn random_name() -> String {
    HEXLOWER.encode(&rand::random::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFileStore;
    use crate::repository::MockFileStore;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const MP4: &[u8] = &[
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'm', b'p', b'4', b'2', 0x00, 0x00, 0x00,
        0x00, b'm', b'p', b'4', b'2', b'i', b's', b'o', b'm',
    ];
    const PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

    #[tokio::test]
    async fn allowed_types_are_stored_under_random_names() {
        let store = Arc::new(MemoryFileStore::new());
        let service = UploadService::new(store.clone(), "/files");

        for (bytes, mime, ext) in [
            (PNG, "image/png", "png"),
            (GIF, "image/gif", "gif"),
            (JPEG, "image/jpeg", "jpg"),
            (MP4, "video/mp4", "mp4"),
        ] {
            let stored = service.upload(bytes).await.unwrap();
            assert_eq!(stored.content_type, mime);
            let (stem, extension) = stored.file_name.split_once('.').unwrap();
            assert_eq!(extension, ext);
            assert_eq!(stem.len(), 32);
            assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(stored.url, format!("files/{}", stored.file_name));
            assert_eq!(store.get(&stored.file_name).await.as_deref(), Some(bytes));
        }
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn rejected_types_never_touch_storage() {
        let mut store = MockFileStore::new();
        store.expect_put().never();
        let service = UploadService::new(Arc::new(store), "/files");

        for bytes in [PDF, b"just some text".as_slice()] {
            let err = service.upload(bytes).await.unwrap_err();
            assert!(matches!(err, ApplicationError::UnsupportedMediaType { .. }));
        }
        assert!(matches!(
            service.upload(&[]).await.unwrap_err(),
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn names_do_not_repeat() {
        assert_ne!(random_name(), random_name());
    }
}
