//! 会话令牌服务
//!
//! 令牌是 HS256 签名的 JWT，载荷为 `{email, iat, exp}`。签发时把
//! `{token, expires_at}` 写回用户记录；校验时除签名和过期外还要求
//! 持久化的会话与令牌一致，清空该字段即可在服务端吊销。
//!
//! 状态机：`issued -> valid -> {expired | revoked}`，再次签发会让旧令牌直接变为 revoked。

use std::sync::Arc;

use chrono::{DateTime, Duration};
use domain::{DomainError, RepositoryError, Session, Timestamp, UserEmail};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock,
    error::{ApplicationError, AuthError},
    repository::UserRepository,
};

/// 单个令牌的有效期
pub const TOKEN_LIFETIME: Duration = Duration::hours(1);

/// 不重新登录的情况下会话可被续期的最长时间。
/// 当前没有续期接口；若增加续期，必须以此为上限。
pub const SESSION_MAX_AGE: Duration = Duration::days(14);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Timestamp,
    pub max_session_age: Duration,
}

pub struct TokenServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct TokenService {
    deps: TokenServiceDependencies,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(deps: TokenServiceDependencies, secret: &str) -> Self {
        Self::with_lifetime(deps, secret, TOKEN_LIFETIME)
    }

    pub fn with_lifetime(deps: TokenServiceDependencies, secret: &str, lifetime: Duration) -> Self {
        Self {
            deps,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub async fn issue(&self, email: &UserEmail) -> Result<IssuedToken, ApplicationError> {
        let now = self.deps.clock.now();
        let iat = now.timestamp();
        let exp = (now + self.lifetime).timestamp();
        // 存储精度对齐到秒，与载荷中的 exp 一致
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| ApplicationError::TokenSigning("expiry out of range".into()))?;

        let claims = Claims {
            email: email.as_str().to_owned(),
            iat,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| ApplicationError::TokenSigning(err.to_string()))?;

        let session = Session {
            token: token.clone(),
            expires_at,
        };
        match self
            .deps
            .user_repository
            .update_session(email.clone(), Some(session))
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(DomainError::UserNotFound.into()),
            Err(err) => return Err(err.into()),
        }

        Ok(IssuedToken {
            token,
            expires_at,
            max_session_age: SESSION_MAX_AGE,
        })
    }

    /// 成功时返回令牌中的邮箱
    pub async fn verify(&self, token: &str) -> Result<UserEmail, ApplicationError> {
        let claims = self.peek_claims(token)?;

        let now = self.deps.clock.now();
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired.into());
        }

        let mut strict = Validation::new(Algorithm::HS256);
        strict.validate_exp = false;
        decode::<Claims>(token, &self.decoding_key, &strict).map_err(|err| {
            tracing::warn!(error = %err, "令牌签名校验失败");
            AuthError::InvalidToken
        })?;

        let email = UserEmail::parse(claims.email).map_err(|_| AuthError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;

        let user = self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?;
        match user {
            Some(user) if user.holds_session(token, expires_at) => Ok(email),
            _ => {
                tracing::warn!(email = %email, "令牌已被吊销");
                Err(AuthError::Revoked.into())
            }
        }
    }

    /// 幂等：会话已清空或用户不存在时同样成功
    pub async fn revoke(&self, email: &UserEmail) -> Result<(), ApplicationError> {
        match self
            .deps
            .user_repository
            .update_session(email.clone(), None)
            .await
        {
            Ok(()) | Err(RepositoryError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// 只解析载荷、不校验签名，用于先判定过期
    fn peek_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut insecure = Validation::new(Algorithm::HS256);
        insecure.insecure_disable_signature_validation();
        insecure.validate_exp = false;
        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &insecure)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
