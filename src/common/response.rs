//! 统一响应信封

use std::borrow::Cow;

use serde::Serialize;

use super::error::ErrorCode;

/// 响应信封
///
/// 成功时 `errcode` 为 0 并携带 `data`，失败时携带 `errmsg`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub errcode: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            errcode: 0,
            errmsg: None,
            data: Some(data),
        }
    }

    pub fn error(code: &'static ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            errcode: code.code,
            errmsg: Some(message.into()),
            data: None,
        }
    }
}

/// 创建类接口的响应数据
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
    pub message: &'static str,
}

impl CreatedResponse {
    pub fn new(id: i64, message: &'static str) -> Self {
        Self { id, message }
    }
}
