//! 日志 API 请求/响应类型

use serde::{Deserialize, Serialize};

use crate::common::AppError;

use super::model::{ApiLog, CallLogRecord, ModelTrainingLog};

/// 分页参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageReq {
    pub skip: i64,
    pub limit: i64,
    pub sort: String,
}

// ============ API 调用日志 ============

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateApiLogReq {
    pub user_id: i64,
    pub api_path: String,
    pub method: String,
    pub request_body: String,
    pub response_body: String,
    pub status_code: i64,
    pub duration: i64,
    pub client_ip: String,
    pub user_agent: String,
    pub created_at: i64,
}

impl CreateApiLogReq {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_path.trim().is_empty() {
            return Err(AppError::validation("api_path is required"));
        }
        if self.method.trim().is_empty() {
            return Err(AppError::validation("method is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetApiLogListReq {
    pub page_info: PageReq,
    pub user_id: i64,
    pub api_path: String,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Serialize)]
pub struct GetApiLogListResp {
    pub logs: Vec<ApiLog>,
    pub total: i64,
}

// ============ 模型训练日志 ============

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateModelTrainingLogReq {
    pub user_id: i64,
    pub model_id: i64,
    pub model_name: String,
    pub status: String,
    pub log_level: String,
    pub log_message: String,
    pub epoch: i64,
    pub loss: f64,
    pub accuracy: f64,
    pub training_time: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetModelTrainingLogListReq {
    pub page_info: PageReq,
    pub user_id: i64,
    pub model_id: i64,
    pub status: String,
    pub log_level: String,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Serialize)]
pub struct GetModelTrainingLogListResp {
    pub logs: Vec<ModelTrainingLog>,
    pub total: i64,
}

// ============ 模型调用日志 ============

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateModelsCallLogReq {
    pub trace_id: String,
    pub node_addr: String,
    pub model: String,
    pub model_id: String,
    pub actual_model: String,
    pub provider: String,
    pub actual_provider: String,
    pub actual_provider_id: String,
    pub caller_key: String,
    pub stream: bool,
    pub report_type: String,
    pub tokens_per_sec: f64,
    pub latency: f64,
    pub step: String,
    pub status_code: i64,
    pub status_message: String,
    /// Unix 秒，缺省或非正数时取当前时间
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetModelsCallLogListReq {
    pub page_info: PageReq,
    pub trace_id: String,
    pub model: String,
    pub caller_key: String,
    pub step: String,
    pub actual_provider_id: String,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Serialize)]
pub struct GetModelsCallLogListResp {
    pub logs: Vec<CallLogRecord>,
    pub total: i64,
}

/// 调用日志详情请求，`created_at` 用于定位分表（缺省为今天）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetModelsCallLogDetailReq {
    pub id: i64,
    pub created_at: i64,
}

// ============ 通用 ============

/// 按 ID 查询详情
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetDetailReq {
    pub id: i64,
}

pub(crate) fn require_id(id: i64) -> Result<i64, AppError> {
    if id <= 0 {
        return Err(AppError::validation("id is required"));
    }
    Ok(id)
}
