use std::sync::Arc;

use domain::{
    DisplayName, DomainError, PasswordHash, RepositoryError, User, UserEmail, UserId,
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{ApplicationError, AuthError},
    password::PasswordHasher,
    repository::UserRepository,
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

/// 凭据存储：注册、密码校验与资料查询
pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let name = DisplayName::parse(request.name)?;
        let email = UserEmail::parse(request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::invalid_argument(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            )
            .into());
        }

        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::user_already_exists(email.as_str()).into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let user = User::register(
            UserId::from(Uuid::new_v4()),
            name,
            request.lastname,
            email.clone(),
            password_hash,
            self.deps.clock.now(),
        );

        match self.deps.user_repository.create(user).await {
            Ok(stored) => {
                tracing::info!(user_id = %stored.id, "新用户注册");
                Ok(stored)
            }
            // 并发注册同一邮箱时由存储层唯一约束兜底
            Err(RepositoryError::Conflict { .. }) => {
                Err(DomainError::user_already_exists(email.as_str()).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 未知邮箱与密码错误都返回 `InvalidCredentials`
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApplicationError> {
        let email = UserEmail::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(user) = self.deps.user_repository.find_by_email(email).await? else {
            tracing::warn!("登录失败：用户不存在");
            return Err(AuthError::InvalidCredentials.into());
        };

        if let Err(err) = self.verify_password(&user.password, password).await {
            tracing::warn!(user_id = %user.id, "登录失败：密码错误");
            return Err(err);
        }

        Ok(user)
    }

    pub async fn verify_password(
        &self,
        stored: &PasswordHash,
        supplied: &str,
    ) -> Result<(), ApplicationError> {
        if self.deps.password_hasher.verify(supplied, stored).await? {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }

    pub async fn profile(&self, email: &UserEmail) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }
}
