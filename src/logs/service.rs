//! 日志业务逻辑服务

use chrono::{DateTime, Utc};

use crate::common::response::CreatedResponse;
use crate::common::{AppError, truncate_str_safe};
use crate::db::schema::{API_LOG_SCHEMA, CALL_LOG_SCHEMA, TRAINING_LOG_SCHEMA};

use super::model::{ApiLog, CallLogRecord, ModelTrainingLog};
use super::query::{PageRequest, SortSpec};
use super::store::{ApiLogFilter, CallLogFilter, LogStore, TrainingLogFilter};
use super::types::{
    CreateApiLogReq, CreateModelTrainingLogReq, CreateModelsCallLogReq, GetApiLogListReq,
    GetApiLogListResp, GetDetailReq, GetModelTrainingLogListReq, GetModelTrainingLogListResp,
    GetModelsCallLogDetailReq, GetModelsCallLogListReq, GetModelsCallLogListResp, PageReq,
    require_id,
};
use super::writer;

/// 日志中路径字段的最大长度
const LOG_FIELD_MAX_BYTES: usize = 128;

/// 日志服务
///
/// 启动时构造一次，通过路由状态注入到各处理器
pub struct LogService {
    store: LogStore,
}

impl LogService {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    fn page(page_info: &PageReq) -> PageRequest {
        PageRequest::new(page_info.skip, page_info.limit)
    }

    // ============ API 调用日志 ============

    pub async fn create_api_log(&self, req: CreateApiLogReq) -> Result<CreatedResponse, AppError> {
        req.validate()?;
        tracing::info!(
            user_id = req.user_id,
            api_path = truncate_str_safe(&req.api_path, LOG_FIELD_MAX_BYTES),
            "创建API调用日志"
        );
        let id = self.store.insert_api_log(req).await?;
        Ok(CreatedResponse::new(id, "api log created"))
    }

    pub async fn get_api_log_list(&self, req: GetApiLogListReq) -> Result<GetApiLogListResp, AppError> {
        tracing::info!(user_id = req.user_id, "获取API日志列表");
        let sort = SortSpec::parse(&req.page_info.sort, &API_LOG_SCHEMA)?;
        let filter = ApiLogFilter {
            user_id: req.user_id,
            api_path: req.api_path,
            start_time: req.start_time,
            end_time: req.end_time,
        };
        let page = self
            .store
            .query_api_logs(&filter, sort, Self::page(&req.page_info))
            .await?;
        Ok(GetApiLogListResp {
            logs: page.rows,
            total: page.total,
        })
    }

    pub async fn get_api_log_detail(&self, req: GetDetailReq) -> Result<ApiLog, AppError> {
        let id = require_id(req.id)?;
        tracing::info!(id, "获取API日志详情");
        self.store.api_log_detail(id).await
    }

    // ============ 模型训练日志 ============

    pub async fn create_model_training_log(
        &self,
        req: CreateModelTrainingLogReq,
    ) -> Result<CreatedResponse, AppError> {
        tracing::info!(
            user_id = req.user_id,
            model_name = truncate_str_safe(&req.model_name, LOG_FIELD_MAX_BYTES),
            "创建模型训练日志"
        );
        let id = self.store.insert_training_log(req).await?;
        Ok(CreatedResponse::new(id, "training log created"))
    }

    pub async fn get_model_training_log_list(
        &self,
        req: GetModelTrainingLogListReq,
    ) -> Result<GetModelTrainingLogListResp, AppError> {
        tracing::info!(model_id = req.model_id, "获取模型训练日志列表");
        let sort = SortSpec::parse(&req.page_info.sort, &TRAINING_LOG_SCHEMA)?;
        let filter = TrainingLogFilter {
            user_id: req.user_id,
            model_id: req.model_id,
            status: req.status,
            log_level: req.log_level,
            start_time: req.start_time,
            end_time: req.end_time,
        };
        let page = self
            .store
            .query_training_logs(&filter, sort, Self::page(&req.page_info))
            .await?;
        Ok(GetModelTrainingLogListResp {
            logs: page.rows,
            total: page.total,
        })
    }

    pub async fn get_model_training_log_detail(
        &self,
        req: GetDetailReq,
    ) -> Result<ModelTrainingLog, AppError> {
        let id = require_id(req.id)?;
        tracing::info!(id, "获取模型训练日志详情");
        self.store.training_log_detail(id).await
    }

    // ============ 模型调用日志 ============

    pub async fn create_models_call_log(
        &self,
        req: CreateModelsCallLogReq,
    ) -> Result<CreatedResponse, AppError> {
        tracing::info!(
            trace_id = %req.trace_id,
            model = %req.model,
            step = %req.step,
            "创建模型调用日志"
        );
        let log = writer::normalize(req, Utc::now())?;
        let id = self.store.write_call_log(log).await?;
        Ok(CreatedResponse::new(id, "call log created"))
    }

    pub async fn get_models_call_log_list(
        &self,
        req: GetModelsCallLogListReq,
    ) -> Result<GetModelsCallLogListResp, AppError> {
        tracing::info!(trace_id = %req.trace_id, model = %req.model, "获取模型调用日志列表");
        let sort = SortSpec::parse(&req.page_info.sort, &CALL_LOG_SCHEMA)?;
        let filter = CallLogFilter {
            trace_id: req.trace_id,
            model: req.model,
            caller_key: req.caller_key,
            step: req.step,
            actual_provider_id: req.actual_provider_id,
            start_time: req.start_time,
            end_time: req.end_time,
        };
        let page = self
            .store
            .query_call_logs(&filter, sort, Self::page(&req.page_info))
            .await?;
        Ok(GetModelsCallLogListResp {
            logs: page.rows,
            total: page.total,
        })
    }

    pub async fn get_models_call_log_detail(
        &self,
        req: GetModelsCallLogDetailReq,
    ) -> Result<CallLogRecord, AppError> {
        let id = require_id(req.id)?;
        let day: DateTime<Utc> = writer::resolve_created_at(req.created_at, Utc::now())?;
        tracing::info!(id, day = %day.date_naive(), "获取模型调用日志详情");
        self.store.call_log_detail(day, id).await
    }
}
