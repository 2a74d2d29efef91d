//! 错误类型定义
//!
//! 业务错误码是一组固定的静态值，所有失败路径只引用它们，不重复构造。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::response::Envelope;

/// 业务错误码
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: i32,
    pub message: &'static str,
}

pub static INTERNAL_SERVER: ErrorCode = ErrorCode {
    code: 500,
    message: "Internal server error",
};

pub static INVALID_PARAMS: ErrorCode = ErrorCode {
    code: 501,
    message: "Invalid request params",
};

pub static NOT_DATA_SET: ErrorCode = ErrorCode {
    code: 1001,
    message: "Record not found",
};

pub static AUTH_FAILED: ErrorCode = ErrorCode {
    code: 1002,
    message: "Authentication failed",
};

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// 会话校验失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// 签名无效或缺少必要字段
    #[error("invalid session token")]
    InvalidToken,
    /// 用户 ID 无法解析
    #[error("invalid user identity")]
    InvalidIdentity,
    /// 缓存中取不到当前 token
    #[error("session token lookup failed")]
    TokenLookupFailed,
    /// token 已被新的登录顶替
    #[error("session token superseded")]
    TokenMismatch,
}

/// 服务统一错误
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid params: {0}")]
    Validation(String),

    #[error("{op} failed on {table}: {source}")]
    Storage {
        op: &'static str,
        table: String,
        #[source]
        source: StorageError,
    },

    #[error("authentication failed: {0}")]
    Auth(AuthFailure),

    #[error("record not found")]
    NotFound,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 包装存储错误并记录日志
    pub fn storage(op: &'static str, table: impl Into<String>, source: StorageError) -> Self {
        let table = table.into();
        tracing::error!(op, table = %table, error = %source, "存储操作失败");
        Self::Storage { op, table, source }
    }

    pub fn code(&self) -> &'static ErrorCode {
        match self {
            Self::Validation(_) => &INVALID_PARAMS,
            Self::Storage { .. } => &INTERNAL_SERVER,
            Self::Auth(_) => &AUTH_FAILED,
            Self::NotFound => &NOT_DATA_SET,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// 返回给调用方的错误描述（存储细节不外泄）
    fn public_message(&self) -> String {
        let code = self.code();
        match self {
            Self::Validation(detail) => format!("{}: {}", code.message, detail),
            Self::Auth(reason) => reason.to_string(),
            Self::Storage { .. } | Self::NotFound => code.message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = Envelope::<()>::error(self.code(), self.public_message());
        (self.status_code(), Json(envelope)).into_response()
    }
}

/// 把阻塞任务中的 sqlite 错误映射到存储错误的便捷别名
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_shared_statics() {
        let a = AppError::NotFound;
        let b = AppError::NotFound;
        assert!(std::ptr::eq(a.code(), b.code()));
        assert_eq!(a.code().code, 1001);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Auth(AuthFailure::TokenMismatch).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        let storage = AppError::Storage {
            op: "insert",
            table: "api_log".to_string(),
            source: StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows),
        };
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.code().code, 500);
    }

    #[test]
    fn test_storage_message_not_leaked() {
        let err = AppError::Storage {
            op: "query",
            table: "status_report_20260101".to_string(),
            source: StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows),
        };
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("status_report_20260101"));
    }

    #[test]
    fn test_auth_failure_message_is_public() {
        let err = AppError::Auth(AuthFailure::TokenMismatch);
        assert_eq!(err.public_message(), "session token superseded");
        assert_eq!(
            err.to_string(),
            "authentication failed: session token superseded"
        );
    }

    #[test]
    fn test_validation_message_includes_detail() {
        let err = AppError::validation("api_path is required");
        assert_eq!(
            err.public_message(),
            "Invalid request params: api_path is required"
        );
    }
}
