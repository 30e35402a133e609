use async_trait::async_trait;
use domain::PasswordHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    /// 存储的哈希无法解析；口令不匹配不算错误
    #[error("stored password hash is unreadable: {0}")]
    Verify(String),
    #[error("password worker did not finish: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for PasswordHasherError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

/// 凭据存储使用的加盐单向哈希。
///
/// `verify` 在口令不匹配时返回 `Ok(false)`，比较由实现的哈希原语以常量时间完成。
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_worker_is_reported_as_worker_error() {
        let join_error = tokio::spawn(async { panic!("hash worker crashed") })
            .await
            .unwrap_err();
        assert!(matches!(
            PasswordHasherError::from(join_error),
            PasswordHasherError::Worker(_)
        ));
    }
}
