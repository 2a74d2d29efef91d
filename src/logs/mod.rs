//! 模型服务日志模块
//!
//! 负责 API 调用日志、模型训练日志和按天分表的模型调用日志的写入与查询

pub mod model;
pub mod partition;
pub mod query;
pub mod service;
pub mod store;
pub mod types;
pub mod writer;
mod handlers;
mod router;

pub use router::create_log_router;
pub use service::LogService;
pub use store::LogStore;
