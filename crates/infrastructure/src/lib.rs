//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储、bcrypt 密码哈希、本地文件存储等适配器，实现应用层定义的接口。

pub mod builder;
pub mod file_store;
pub mod migrations;
pub mod password;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureError};
pub use file_store::LocalFileStore;
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{create_pg_pool, PgChatMessageRepository, PgUserRepository};
