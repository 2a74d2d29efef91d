//! 模型调用日志写入前的规范化

use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use crate::common::AppError;

use super::partition;
use super::types::CreateModelsCallLogReq;

/// 规范化后的调用日志
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCallLog {
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
    pub created_at: DateTime<Utc>,
}

impl NormalizedCallLog {
    /// 目标分表
    pub fn partition(&self) -> String {
        partition::partition_name(self.created_at)
    }

    /// 按 `CALL_LOG_SCHEMA` 的列顺序展开
    pub(crate) fn into_params(self) -> Vec<Value> {
        vec![
            Value::Text(self.trace_id),
            Value::Text(self.node_addr),
            Value::Text(self.model),
            Value::Text(self.model_id),
            Value::Text(self.actual_model),
            Value::Text(self.provider),
            Value::Text(self.actual_provider),
            Value::Text(self.actual_provider_id),
            Value::Text(self.caller_key),
            Value::Integer(self.stream),
            Value::Text(self.report_type),
            Value::Real(self.tokens_per_sec),
            Value::Text(self.latency),
            Value::Text(self.step),
            Value::Integer(self.status_code),
            Value::Text(self.status_message),
            Value::Integer(self.created_at.timestamp()),
        ]
    }
}

/// 延迟统一保留 4 位小数
pub fn format_latency(latency: f64) -> String {
    format!("{:.4}", latency)
}

/// Unix 秒转时间，非正数取 `now`
pub fn resolve_created_at(created_at: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    if created_at <= 0 {
        return Ok(now);
    }
    DateTime::from_timestamp(created_at, 0)
        .ok_or_else(|| AppError::validation(format!("created_at out of range: {}", created_at)))
}

/// 规范化调用日志：stream 转 0/1、补齐创建时间、延迟转定长字符串
pub fn normalize(
    req: CreateModelsCallLogReq,
    now: DateTime<Utc>,
) -> Result<NormalizedCallLog, AppError> {
    let created_at = resolve_created_at(req.created_at, now)?;

    Ok(NormalizedCallLog {
        trace_id: req.trace_id,
        node_addr: req.node_addr,
        model: req.model,
        model_id: req.model_id,
        actual_model: req.actual_model,
        provider: req.provider,
        actual_provider: req.actual_provider,
        actual_provider_id: req.actual_provider_id,
        caller_key: req.caller_key,
        stream: i64::from(req.stream),
        report_type: req.report_type,
        tokens_per_sec: req.tokens_per_sec,
        latency: format_latency(req.latency),
        step: req.step,
        status_code: req.status_code,
        status_message: req.status_message,
        created_at,
    })
}
