//! 会话 JWT 校验
//!
//! 签名密钥由 `{app}-{version}-{userId}` 派生，与登录服务签发时一致

use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// 会话 Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// 用户 ID（十进制字符串）
    pub id: String,
    /// 本次登录的会话 token
    pub token: String,
    /// 过期时间（可选，存在时校验）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// 派生签名密钥
pub fn derive_secret(app_name: &str, app_version: &str, user_id: &str) -> String {
    format!("{}-{}-{}", app_name, app_version, user_id)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // 登录服务签发的 token 不一定带 exp
    validation.required_spec_claims.clear();
    validation
}

/// 签发会话 token（与登录服务算法一致）
#[cfg(test)]
pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// 校验会话 token，`id` 或 `token` 为空视为缺少字段
pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )
    .map_err(|e| anyhow!("Invalid token: {}", e))?;

    let claims = data.claims;
    if claims.id.is_empty() || claims.token.is_empty() {
        return Err(anyhow!("Invalid token: missing id or token claim"));
    }
    Ok(claims)
}
