//! 日志 API 路由

use std::sync::Arc;

use axum::{Router, middleware, routing::post};

use crate::session::{SessionGate, session_gate_middleware};

use super::handlers::{
    create_api_log, create_model_training_log, create_models_call_log, get_api_log_detail,
    get_api_log_list, get_model_training_log_detail, get_model_training_log_list,
    get_models_call_log_detail, get_models_call_log_list,
};
use super::service::LogService;

/// 日志 API 状态
#[derive(Clone)]
pub struct LogState {
    pub service: Arc<LogService>,
}

/// 创建日志 API 路由
///
/// # 端点
/// 全部为 `POST`，挂在 `/log` 下：
/// - `createApiLog` / `getApiLogList` / `getApiLogDetail`
/// - `createModelTrainingLog` / `getModelTrainingLogList` / `getModelTrainingLogDetail`
/// - `createModelsCallLog` / `getModelsCallLogList` / `getModelsCallLogDetail`
///
/// # 认证
/// 所有端点经过会话校验中间件
pub fn create_log_router(service: Arc<LogService>, gate: Arc<SessionGate>) -> Router {
    let state = LogState { service };

    let routes = Router::new()
        .route("/createApiLog", post(create_api_log))
        .route("/getApiLogList", post(get_api_log_list))
        .route("/getApiLogDetail", post(get_api_log_detail))
        .route("/createModelTrainingLog", post(create_model_training_log))
        .route("/getModelTrainingLogList", post(get_model_training_log_list))
        .route("/getModelTrainingLogDetail", post(get_model_training_log_detail))
        .route("/createModelsCallLog", post(create_models_call_log))
        .route("/getModelsCallLogList", post(get_models_call_log_list))
        .route("/getModelsCallLogDetail", post(get_models_call_log_detail));

    Router::new()
        .nest("/log", routes)
        .layer(middleware::from_fn_with_state(gate, session_gate_middleware))
        .with_state(state)
}
