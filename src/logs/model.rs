//! 日志记录数据模型

use rusqlite::Row;
use serde::Serialize;

/// API 调用日志
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLog {
    pub id: i64,
    pub user_id: i64,
    pub api_path: String,
    pub method: String,
    pub request_body: String,
    pub response_body: String,
    pub status_code: i64,
    /// 请求耗时（毫秒）
    pub duration: i64,
    pub client_ip: String,
    pub user_agent: String,
    pub created_at: i64,
}

impl ApiLog {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            api_path: row.get(2)?,
            method: row.get(3)?,
            request_body: row.get(4)?,
            response_body: row.get(5)?,
            status_code: row.get(6)?,
            duration: row.get(7)?,
            client_ip: row.get(8)?,
            user_agent: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

/// 模型训练日志
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTrainingLog {
    pub id: i64,
    pub user_id: i64,
    pub model_id: i64,
    pub model_name: String,
    /// pending / running / completed / failed
    pub status: String,
    pub log_level: String,
    pub log_message: String,
    pub epoch: i64,
    pub loss: f64,
    pub accuracy: f64,
    /// 训练时长（秒）
    pub training_time: i64,
    pub created_at: i64,
}

impl ModelTrainingLog {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            model_id: row.get(2)?,
            model_name: row.get(3)?,
            status: row.get(4)?,
            log_level: row.get(5)?,
            log_message: row.get(6)?,
            epoch: row.get(7)?,
            loss: row.get(8)?,
            accuracy: row.get(9)?,
            training_time: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

/// 模型调用状态日志（落库形态）
///
/// `stream` 为 0/1，`latency` 为保留 4 位小数的字符串
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallLogRecord {
    pub id: i64,
    pub trace_id: String,
    pub node_addr: String,
    pub model: String,
    pub model_id: String,
    pub actual_model: String,
    pub provider: String,
    pub actual_provider: String,
    pub actual_provider_id: String,
    pub caller_key: String,
    pub stream: i64,
    pub report_type: String,
    pub tokens_per_sec: f64,
    pub latency: String,
    pub step: String,
    pub status_code: i64,
    pub status_message: String,
    pub created_at: i64,
    /// 所在分表，id 只在分表内唯一
    pub partition: String,
}

impl CallLogRecord {
    /// 列顺序为 `id` + 表结构声明的列 + 分表名
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            trace_id: row.get(1)?,
            node_addr: row.get(2)?,
            model: row.get(3)?,
            model_id: row.get(4)?,
            actual_model: row.get(5)?,
            provider: row.get(6)?,
            actual_provider: row.get(7)?,
            actual_provider_id: row.get(8)?,
            caller_key: row.get(9)?,
            stream: row.get(10)?,
            report_type: row.get(11)?,
            tokens_per_sec: row.get(12)?,
            latency: row.get(13)?,
            step: row.get(14)?,
            status_code: row.get(15)?,
            status_message: row.get(16)?,
            created_at: row.get(17)?,
            partition: row.get(18)?,
        })
    }
}
