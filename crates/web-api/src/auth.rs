//! 会话中间件
//!
//! 只挂在受保护的路由上：缺少或格式错误的 `Authorization` 头直接返回 401，
//! 否则交给令牌服务校验，成功后把身份放进请求扩展，由处理器显式取出。

use application::AuthError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use domain::UserEmail;

use crate::{error::ApiError, state::AppState};

/// 已认证的请求身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: UserEmail,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::Unauthenticated)?
        .to_owned();

    let email = state.token_service.verify(&token).await.map_err(|err| {
        tracing::warn!(path = %request.uri().path(), error = %err, "拒绝未通过校验的令牌");
        ApiError::from(err)
    })?;

    request.extensions_mut().insert(AuthUser { email });
    Ok(next.run(request).await)
}

/// 提取 `Bearer <token>`，方案名大小写不敏感
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
