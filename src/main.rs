mod common;
mod db;
mod logs;
mod model;
mod session;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;

use db::Database;
use logs::{LogService, LogStore};
use model::config::Config;
use session::{MemorySessionCache, RedisSessionCache, SessionCache, SessionGate};

/// 模型服务日志后端
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = Config::default_config_path())]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config))?;
    config.apply_env_overrides();
    tracing::info!(
        app = %config.app_name,
        version = %config.app_version,
        database = %config.database_path,
        "配置已加载"
    );

    let db = Database::open(&config.database_path, config.pool_size)
        .with_context(|| format!("打开数据库失败: {}", config.database_path))?;
    let store = LogStore::new(db, config.max_query_days);
    store.sync_static_tables().await?;

    let cache: Arc<dyn SessionCache> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(RedisSessionCache::connect(url).await?),
        None => {
            tracing::warn!("未配置 redisUrl，使用进程内会话缓存（仅限单机调试）");
            Arc::new(MemorySessionCache::new())
        }
    };
    let gate = Arc::new(SessionGate::new(
        config.app_name.clone(),
        config.app_version.clone(),
        &config.token_header,
        &config.user_id_header,
        cache,
    )?);

    let service = Arc::new(LogService::new(store));
    let app = logs::create_log_router(service, gate).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("监听地址失败: {}", addr))?;
    tracing::info!("日志服务已启动: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("日志服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
    }
}
