use std::{path::PathBuf, sync::Arc};

use application::{
    ChatHub, ChatHubDependencies, ChatMessageRepository, ChatService, ChatServiceDependencies,
    Clock, FileStore, PasswordHasher, TokenService, TokenServiceDependencies, UploadService,
    UserRepository, UserService, UserServiceDependencies,
};
use config::AppConfig;

/// 构建应用状态所需的外部适配器
pub struct StateDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn ChatMessageRepository>,
    pub file_store: Arc<dyn FileStore>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub uploads_dir: PathBuf,
    pub public_prefix: String,
    pub max_upload_bytes: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub token_service: Arc<TokenService>,
    pub chat_service: Arc<ChatService>,
    pub hub: Arc<ChatHub>,
    pub upload_service: Arc<UploadService>,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    /// 进程启动时构建一次，之后以句柄形式传给各个处理器
    pub fn assemble(deps: StateDependencies, config: &AppConfig) -> Self {
        let user_service = UserService::new(UserServiceDependencies {
            user_repository: deps.user_repository.clone(),
            password_hasher: deps.password_hasher,
            clock: deps.clock.clone(),
        });
        let token_service = TokenService::with_lifetime(
            TokenServiceDependencies {
                user_repository: deps.user_repository.clone(),
                clock: deps.clock,
            },
            &config.token.secret,
            chrono::Duration::minutes(config.token.lifetime_minutes),
        );
        let chat_service = ChatService::new(ChatServiceDependencies {
            message_repository: deps.message_repository.clone(),
            user_repository: deps.user_repository.clone(),
        });
        let hub = ChatHub::new(ChatHubDependencies {
            message_repository: deps.message_repository,
            user_repository: deps.user_repository,
        });
        let upload_service = UploadService::new(deps.file_store, &config.uploads.public_prefix);

        Self {
            user_service: Arc::new(user_service),
            token_service: Arc::new(token_service),
            chat_service: Arc::new(chat_service),
            hub: Arc::new(hub),
            upload_service: Arc::new(upload_service),
            settings: Arc::new(HttpSettings {
                uploads_dir: PathBuf::from(&config.uploads.dir),
                public_prefix: config.uploads.public_prefix.clone(),
                max_upload_bytes: config.max_upload_bytes(),
            }),
        }
    }
}
