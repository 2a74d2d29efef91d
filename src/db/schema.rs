//! 表结构声明
//!
//! 表结构在这里显式声明并带版本号，建表逻辑只读取声明，不从内存中的记录类型推导。

use rusqlite::Connection;

use crate::common::error::StorageResult;

/// 列定义
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub default: &'static str,
    pub indexed: bool,
}

const fn col(name: &'static str, sql_type: &'static str, default: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        default,
        indexed: false,
    }
}

const fn indexed(name: &'static str, sql_type: &'static str, default: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        default,
        indexed: true,
    }
}

/// 一类日志表的结构（主键 `id` 隐含在每张表中）
#[derive(Debug)]
pub struct TableSchema {
    pub family: &'static str,
    pub version: u32,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    /// `id, col1, col2, ...`
    pub fn select_list(&self) -> String {
        std::iter::once("id")
            .chain(self.columns.iter().map(|c| c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 插入语句（不含 id）
    pub fn insert_sql(&self, table: &str) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// 建表及索引语句，均为幂等语句
    pub fn create_sql(&self, table: &str) -> String {
        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        columns.extend(
            self.columns
                .iter()
                .map(|c| format!("{} {} NOT NULL DEFAULT {}", c.name, c.sql_type, c.default)),
        );

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n);",
            table,
            columns.join(",\n    ")
        );
        for c in self.columns.iter().filter(|c| c.indexed) {
            sql.push_str(&format!(
                "\nCREATE INDEX IF NOT EXISTS \"idx_{table}_{col}\" ON \"{table}\"({col});",
                table = table,
                col = c.name
            ));
        }
        sql
    }
}

/// 模型调用日志（按天分表）
pub static CALL_LOG_SCHEMA: TableSchema = TableSchema {
    family: "status_report",
    version: 1,
    columns: &[
        indexed("trace_id", "TEXT", "''"),
        col("node_addr", "TEXT", "''"),
        indexed("model", "TEXT", "''"),
        col("model_id", "TEXT", "''"),
        col("actual_model", "TEXT", "''"),
        col("provider", "TEXT", "''"),
        col("actual_provider", "TEXT", "''"),
        col("actual_provider_id", "TEXT", "''"),
        indexed("caller_key", "TEXT", "''"),
        col("stream", "INTEGER", "0"),
        col("report_type", "TEXT", "''"),
        col("tokens_per_sec", "REAL", "0"),
        col("latency", "TEXT", "'0.0000'"),
        col("step", "TEXT", "''"),
        col("status_code", "INTEGER", "0"),
        col("status_message", "TEXT", "''"),
        indexed("created_at", "INTEGER", "0"),
    ],
};

/// API 调用日志
pub static API_LOG_SCHEMA: TableSchema = TableSchema {
    family: "api_log",
    version: 1,
    columns: &[
        indexed("user_id", "INTEGER", "0"),
        indexed("api_path", "TEXT", "''"),
        col("method", "TEXT", "''"),
        col("request_body", "TEXT", "''"),
        col("response_body", "TEXT", "''"),
        col("status_code", "INTEGER", "0"),
        col("duration", "INTEGER", "0"),
        col("client_ip", "TEXT", "''"),
        col("user_agent", "TEXT", "''"),
        indexed("created_at", "INTEGER", "0"),
    ],
};

/// 模型训练日志
pub static TRAINING_LOG_SCHEMA: TableSchema = TableSchema {
    family: "model_training_log",
    version: 1,
    columns: &[
        indexed("user_id", "INTEGER", "0"),
        indexed("model_id", "INTEGER", "0"),
        col("model_name", "TEXT", "''"),
        indexed("status", "TEXT", "''"),
        col("log_level", "TEXT", "''"),
        col("log_message", "TEXT", "''"),
        col("epoch", "INTEGER", "0"),
        col("loss", "REAL", "0"),
        col("accuracy", "REAL", "0"),
        col("training_time", "INTEGER", "0"),
        indexed("created_at", "INTEGER", "0"),
    ],
};

/// 记录已创建的表及其结构版本
const SCHEMA_META_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_meta (
    table_name TEXT PRIMARY KEY,
    family TEXT NOT NULL,
    version INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);";

/// 检查表是否存在
pub fn table_exists(conn: &Connection, table: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// 在当前连接（通常处于事务中）上建表并登记版本
pub fn create_table(conn: &Connection, schema: &TableSchema, table: &str) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_META_SQL)?;
    conn.execute_batch(&schema.create_sql(table))?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (table_name, family, version, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            table,
            schema.family,
            schema.version,
            chrono::Utc::now().timestamp()
        ],
    )?;
    Ok(())
}

/// 登记的结构版本
#[cfg(test)]
pub fn recorded_version(conn: &Connection, table: &str) -> StorageResult<Option<u32>> {
    if !table_exists(conn, "schema_meta")? {
        return Ok(None);
    }
    let mut stmt = conn.prepare("SELECT version FROM schema_meta WHERE table_name = ?1")?;
    let mut rows = stmt.query([table])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}
