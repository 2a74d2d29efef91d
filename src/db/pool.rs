//! SQLite 连接池
//!
//! 基于 r2d2，每个新连接初始化为 WAL 模式并设置写锁等待上限。

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::common::error::StorageResult;

/// 写锁等待上限
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 借出连接的等待上限
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    })?;
    conn.pragma_update(None, "synchronous", "NORMAL")
}

/// 数据库句柄（可廉价克隆）
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// 打开数据库，建池时即建立连接，路径或权限有问题时在启动阶段暴露
    pub fn open(path: impl AsRef<Path>, pool_size: usize) -> StorageResult<Self> {
        let path = path.as_ref();
        let pool_size = u32::try_from(pool_size.max(1)).unwrap_or(u32::MAX);
        let manager = SqliteConnectionManager::file(path).with_init(init_connection);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)?;

        tracing::info!(path = %path.display(), pool_size, "数据库连接池已初始化");
        Ok(Self { pool })
    }

    /// 在阻塞线程上借出连接并执行一段同步操作
    pub async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}
