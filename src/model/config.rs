use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 日志服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 应用名，参与会话密钥与缓存 key 的派生
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// 应用版本，参与会话密钥与缓存 key 的派生
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// SQLite 数据库文件路径
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// 数据库连接池大小
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// 会话缓存 Redis 地址（可选，未配置时使用进程内缓存，仅限单机调试）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// 携带会话 JWT 的请求头
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// 携带用户 ID 的请求头
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,

    /// 调用日志单次查询最多跨越的天数
    #[serde(default = "default_max_query_days")]
    pub max_query_days: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_app_name() -> String {
    "TopModelsLogs".to_string()
}

fn default_app_version() -> String {
    "v1".to_string()
}

fn default_database_path() -> String {
    "logs.db".to_string()
}

fn default_pool_size() -> usize {
    8
}

fn default_token_header() -> String {
    "jwt".to_string()
}

fn default_user_id_header() -> String {
    "id".to_string()
}

fn default_max_query_days() -> u32 {
    31
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app_name: default_app_name(),
            app_version: default_app_version(),
            database_path: default_database_path(),
            pool_size: default_pool_size(),
            redis_url: None,
            token_header: default_token_header(),
            user_id_header: default_user_id_header(),
            max_query_days: default_max_query_days(),
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 用环境变量 `APP_NAME` / `APP_VERSION` 覆盖应用标识
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("APP_NAME").ok(),
            std::env::var("APP_VERSION").ok(),
        );
    }

    fn apply_overrides(&mut self, app_name: Option<String>, app_version: Option<String>) {
        if let Some(name) = app_name.filter(|v| !v.trim().is_empty()) {
            self.app_name = name;
        }
        if let Some(version) = app_version.filter(|v| !v.trim().is_empty()) {
            self.app_version = version;
        }
    }
}
