//! 日志 API 处理器

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;

use crate::common::response::CreatedResponse;
use crate::common::{AppError, Envelope};

use super::model::{ApiLog, CallLogRecord, ModelTrainingLog};
use super::router::LogState;
use super::types::{
    CreateApiLogReq, CreateModelTrainingLogReq, CreateModelsCallLogReq, GetApiLogListReq,
    GetApiLogListResp, GetDetailReq, GetModelTrainingLogListReq, GetModelTrainingLogListResp,
    GetModelsCallLogDetailReq, GetModelsCallLogListReq, GetModelsCallLogListResp,
};

type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

/// 请求体解析失败统一转为参数错误
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::validation(e.body_text()))
}

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope::ok(data)))
}

/// POST /log/createApiLog
pub async fn create_api_log(
    State(state): State<LogState>,
    payload: Result<Json<CreateApiLogReq>, JsonRejection>,
) -> ApiResult<CreatedResponse> {
    ok(state.service.create_api_log(body(payload)?).await?)
}

/// POST /log/getApiLogList
pub async fn get_api_log_list(
    State(state): State<LogState>,
    payload: Result<Json<GetApiLogListReq>, JsonRejection>,
) -> ApiResult<GetApiLogListResp> {
    ok(state.service.get_api_log_list(body(payload)?).await?)
}

/// POST /log/getApiLogDetail
pub async fn get_api_log_detail(
    State(state): State<LogState>,
    payload: Result<Json<GetDetailReq>, JsonRejection>,
) -> ApiResult<ApiLog> {
    ok(state.service.get_api_log_detail(body(payload)?).await?)
}

/// POST /log/createModelTrainingLog
pub async fn create_model_training_log(
    State(state): State<LogState>,
    payload: Result<Json<CreateModelTrainingLogReq>, JsonRejection>,
) -> ApiResult<CreatedResponse> {
    ok(state
        .service
        .create_model_training_log(body(payload)?)
        .await?)
}

/// POST /log/getModelTrainingLogList
pub async fn get_model_training_log_list(
    State(state): State<LogState>,
    payload: Result<Json<GetModelTrainingLogListReq>, JsonRejection>,
) -> ApiResult<GetModelTrainingLogListResp> {
    ok(state
        .service
        .get_model_training_log_list(body(payload)?)
        .await?)
}

/// POST /log/getModelTrainingLogDetail
pub async fn get_model_training_log_detail(
    State(state): State<LogState>,
    payload: Result<Json<GetDetailReq>, JsonRejection>,
) -> ApiResult<ModelTrainingLog> {
    ok(state
        .service
        .get_model_training_log_detail(body(payload)?)
        .await?)
}

/// POST /log/createModelsCallLog
pub async fn create_models_call_log(
    State(state): State<LogState>,
    payload: Result<Json<CreateModelsCallLogReq>, JsonRejection>,
) -> ApiResult<CreatedResponse> {
    ok(state.service.create_models_call_log(body(payload)?).await?)
}

/// POST /log/getModelsCallLogList
pub async fn get_models_call_log_list(
    State(state): State<LogState>,
    payload: Result<Json<GetModelsCallLogListReq>, JsonRejection>,
) -> ApiResult<GetModelsCallLogListResp> {
    ok(state
        .service
        .get_models_call_log_list(body(payload)?)
        .await?)
}

/// POST /log/getModelsCallLogDetail
pub async fn get_models_call_log_detail(
    State(state): State<LogState>,
    payload: Result<Json<GetModelsCallLogDetailReq>, JsonRejection>,
) -> ApiResult<CallLogRecord> {
    ok(state
        .service
        .get_models_call_log_detail(body(payload)?)
        .await?)
}
