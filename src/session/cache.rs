//! 会话 token 缓存
//!
//! 登录服务负责写入，这里只读取用户当前有效的 token

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// 用户当前会话 token 的缓存 key
pub fn user_token_key(app_name: &str, app_version: &str, user_id: i64) -> String {
    format!("{}:{}:user:logUserToken:{}", app_name, app_version, user_id)
}

/// 会话缓存
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// 读取 key 对应的值，不存在返回 `None`
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Redis 实现
pub struct RedisSessionCache {
    conn: ConnectionManager,
}

impl RedisSessionCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Redis 会话缓存已连接: {}", redis_url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        // ConnectionManager clone 开销很小，内部共享同一连接
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}

/// 进程内实现，仅用于单机调试和测试
#[derive(Default)]
pub struct MemorySessionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_token_key() {
        assert_eq!(
            user_token_key("TopModelsLogs", "v1", 42),
            "TopModelsLogs:v1:user:logUserToken:42"
        );
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemorySessionCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "v1");
        cache.set("k", "v2");
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v2"));
    }
}
