use std::{sync::Arc, time::Duration};

use application::{
    ChatMessageRepository, Deadline, FileStore, PasswordHasher, UserRepository,
};
use config::AppConfig;
use sqlx::PgPool;
use thiserror::Error;

use crate::{
    file_store::LocalFileStore,
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    repository::{create_pg_pool, PgChatMessageRepository, PgUserRepository},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("upload directory error: {0}")]
    Uploads(#[from] std::io::Error),
}

/// 组装好的适配器；仓储与文件存储都已带上单次调用超时
#[derive(Clone)]
pub struct Infrastructure {
    pub pool: PgPool,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn ChatMessageRepository>,
    pub file_store: Arc<dyn FileStore>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

impl Infrastructure {
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let pool = create_pg_pool(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_seconds),
        )
        .await?;
        MIGRATOR.run(&pool).await?;
        tracing::info!("数据库迁移完成");

        let file_store = LocalFileStore::new(&config.uploads.dir);
        file_store.ensure_root().await?;

        let timeout = config.persistence_timeout();
        let user_repository: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
        let message_repository: Arc<dyn ChatMessageRepository> =
            Arc::new(PgChatMessageRepository::new(pool.clone()));
        let file_store: Arc<dyn FileStore> = Arc::new(file_store);

        Ok(Self {
            pool,
            user_repository: Arc::new(Deadline::new(user_repository, timeout)),
            message_repository: Arc::new(Deadline::new(message_repository, timeout)),
            file_store: Arc::new(Deadline::new(file_store, timeout)),
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(
                config.security.bcrypt_cost,
            ))),
        })
    }
}
