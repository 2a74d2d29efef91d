//! 会话校验中间件
//!
//! 携带 token 的请求必须对应用户当前唯一有效的登录会话；
//! 未携带 token 的请求按匿名放行。

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::common::{AppError, AuthFailure};

use super::cache::{SessionCache, user_token_key};
use super::jwt;

/// 通过校验的用户，写入请求扩展供后续处理器读取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// 未携带 token
    Anonymous,
    /// 会话有效
    Authorized(i64),
}

/// 会话校验器
pub struct SessionGate {
    app_name: String,
    app_version: String,
    token_header: HeaderName,
    user_id_header: HeaderName,
    cache: Arc<dyn SessionCache>,
}

impl SessionGate {
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        token_header: &str,
        user_id_header: &str,
        cache: Arc<dyn SessionCache>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            token_header: HeaderName::from_bytes(token_header.as_bytes())?,
            user_id_header: HeaderName::from_bytes(user_id_header.as_bytes())?,
            cache,
        })
    }

    fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// 校验请求头中的会话
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<GateOutcome, AuthFailure> {
        let token = Self::header(headers, &self.token_header);
        if token.is_empty() {
            return Ok(GateOutcome::Anonymous);
        }

        let claimed_id = Self::header(headers, &self.user_id_header);
        let secret = jwt::derive_secret(&self.app_name, &self.app_version, claimed_id);
        let claims = jwt::verify_token(token, &secret).map_err(|e| {
            tracing::debug!("会话 token 校验失败: {}", e);
            AuthFailure::InvalidToken
        })?;

        let user_id: i64 = claims
            .id
            .parse()
            .map_err(|_| AuthFailure::InvalidIdentity)?;

        let key = user_token_key(&self.app_name, &self.app_version, user_id);
        let current = match self.cache.get(&key).await {
            Ok(Some(current)) => current,
            Ok(None) => return Err(AuthFailure::TokenLookupFailed),
            Err(e) => {
                tracing::error!(user_id, "读取会话缓存失败: {}", e);
                return Err(AuthFailure::TokenLookupFailed);
            }
        };

        let matched: bool = claims.token.as_bytes().ct_eq(current.as_bytes()).into();
        if !matched {
            return Err(AuthFailure::TokenMismatch);
        }
        Ok(GateOutcome::Authorized(user_id))
    }
}

/// 会话校验中间件
pub async fn session_gate_middleware(
    State(gate): State<Arc<SessionGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate.authorize(request.headers()).await {
        Ok(GateOutcome::Anonymous) => next.run(request).await,
        Ok(GateOutcome::Authorized(user_id)) => {
            request
                .headers_mut()
                .insert(gate.user_id_header.clone(), HeaderValue::from(user_id));
            request.extensions_mut().insert(AuthenticatedUser(user_id));
            next.run(request).await
        }
        Err(failure) => {
            tracing::warn!(
                claimed_id = SessionGate::header(request.headers(), &gate.user_id_header),
                path = %request.uri().path(),
                "会话校验未通过: {}",
                failure
            );
            AppError::Auth(failure).into_response()
        }
    }
}
