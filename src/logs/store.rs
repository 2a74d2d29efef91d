//! 日志存储
//!
//! 三类日志的写入与查询。模型调用日志按 UTC 自然日分表，首次写入时建表，
//! 查询时按时间范围展开到多张分表。

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params_from_iter};

use crate::common::AppError;
use crate::db::Database;
use crate::db::schema::{self, API_LOG_SCHEMA, CALL_LOG_SCHEMA, TRAINING_LOG_SCHEMA, TableSchema};

use super::model::{ApiLog, CallLogRecord, ModelTrainingLog};
use super::partition;
use super::query::{self, Page, PageRequest, QueryFilter, SortSpec};
use super::types::{CreateApiLogReq, CreateModelTrainingLogReq};
use super::writer::{self, NormalizedCallLog};

/// 单张表的日志（非分表）
static STATIC_TABLES: [&TableSchema; 2] = [&API_LOG_SCHEMA, &TRAINING_LOG_SCHEMA];

/// 调用日志查询条件
#[derive(Debug, Clone, Default)]
pub struct CallLogFilter {
    pub trace_id: String,
    pub model: String,
    pub caller_key: String,
    pub step: String,
    pub actual_provider_id: String,
    /// Unix 秒，非正数表示不限
    pub start_time: i64,
    pub end_time: i64,
}

impl CallLogFilter {
    fn to_query(&self) -> QueryFilter {
        QueryFilter::new()
            .eq_text("trace_id", &self.trace_id)
            .eq_text("model", &self.model)
            .eq_text("caller_key", &self.caller_key)
            .eq_text("step", &self.step)
            .eq_text("actual_provider_id", &self.actual_provider_id)
            .between("created_at", self.start_time, self.end_time)
    }

    /// 根据时间范围确定需要查询的分表
    ///
    /// - 起止都有：区间内每一天
    /// - 只有起点：起点当天到今天
    /// - 只有终点：终点当天
    /// - 都没有：今天
    fn partitions(&self, now: DateTime<Utc>, max_days: u32) -> Result<Vec<String>, AppError> {
        let start = timestamp_bound("start_time", self.start_time)?;
        let end = timestamp_bound("end_time", self.end_time)?;

        let (from, to) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => (s, now.max(s)),
            (None, Some(e)) => (e, e),
            (None, None) => (now, now),
        };
        if to < from {
            return Err(AppError::validation("end_time is earlier than start_time"));
        }

        let days = (to.date_naive() - from.date_naive()).num_days() + 1;
        if days > i64::from(max_days) {
            return Err(AppError::validation(format!(
                "time range spans {} days, at most {} allowed",
                days, max_days
            )));
        }
        Ok(partition::partitions_between(from, to))
    }
}

fn timestamp_bound(field: &str, value: i64) -> Result<Option<DateTime<Utc>>, AppError> {
    if value <= 0 {
        return Ok(None);
    }
    DateTime::from_timestamp(value, 0)
        .map(Some)
        .ok_or_else(|| AppError::validation(format!("{} out of range: {}", field, value)))
}

/// API 日志查询条件
#[derive(Debug, Clone, Default)]
pub struct ApiLogFilter {
    pub user_id: i64,
    pub api_path: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// 训练日志查询条件
#[derive(Debug, Clone, Default)]
pub struct TrainingLogFilter {
    pub user_id: i64,
    pub model_id: i64,
    pub status: String,
    pub log_level: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// 日志存储
#[derive(Clone)]
pub struct LogStore {
    db: Database,
    max_query_days: u32,
}

impl LogStore {
    pub fn new(db: Database, max_query_days: u32) -> Self {
        Self {
            db,
            max_query_days: max_query_days.max(1),
        }
    }

    /// 启动时同步非分表日志的表结构
    pub async fn sync_static_tables(&self) -> Result<(), AppError> {
        for table_schema in STATIC_TABLES {
            let family = table_schema.family;
            self.db
                .run(move |conn| schema::create_table(conn, table_schema, family))
                .await
                .map_err(|e| AppError::storage("sync_schema", family, e))?;
            tracing::info!(table = family, version = table_schema.version, "表结构已同步");
        }
        Ok(())
    }

    // ============ 模型调用日志 ============

    /// 确保分表存在，重复调用安全
    pub async fn ensure_partition(&self, name: &str) -> Result<(), AppError> {
        if !partition::is_valid_table_name(name) {
            return Err(AppError::validation(format!("invalid partition name: {}", name)));
        }

        let table = name.to_string();
        let created = self
            .db
            .run(move |conn| partition::ensure_partition(conn, &table))
            .await
            .map_err(|e| AppError::storage("ensure_partition", name, e))?;
        if created {
            tracing::info!(table = name, "创建日志分表成功");
        }
        Ok(())
    }

    /// 写入调用日志，返回分表内的 id
    pub async fn write_call_log(&self, log: NormalizedCallLog) -> Result<i64, AppError> {
        let table = log.partition();
        self.ensure_partition(&table).await?;

        let sql = CALL_LOG_SCHEMA.insert_sql(&table);
        let params = log.into_params();
        self.db
            .run(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| AppError::storage("insert", table, e))
    }

    /// 分页查询调用日志，按时间范围展开到多张分表
    pub async fn query_call_logs(
        &self,
        filter: &CallLogFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> Result<Page<CallLogRecord>, AppError> {
        let candidates = filter.partitions(Utc::now(), self.max_query_days)?;
        let predicate = filter.to_query();
        let target = candidates.join(",");

        self.db
            .run(move |conn| {
                let tables = partition::existing_partitions(conn, &candidates)?;
                query::select_page(
                    conn,
                    &CALL_LOG_SCHEMA,
                    &tables,
                    &predicate,
                    &sort,
                    page,
                    CallLogRecord::from_row,
                )
            })
            .await
            .map_err(|e| AppError::storage("query", target, e))
    }

    /// 按 id 查询调用日志，`day` 决定分表
    pub async fn call_log_detail(
        &self,
        day: DateTime<Utc>,
        id: i64,
    ) -> Result<CallLogRecord, AppError> {
        let table = partition::partition_name(day);
        let lookup = table.clone();
        let record = self
            .db
            .run(move |conn| {
                if !schema::table_exists(conn, &lookup)? {
                    return Ok(None);
                }
                let sql = format!(
                    "SELECT {}, '{t}' FROM \"{t}\" WHERE id = ?1",
                    CALL_LOG_SCHEMA.select_list(),
                    t = lookup
                );
                Ok(conn
                    .query_row(&sql, [id], CallLogRecord::from_row)
                    .optional()?)
            })
            .await
            .map_err(|e| AppError::storage("detail", table, e))?;
        record.ok_or(AppError::NotFound)
    }

    // ============ API 调用日志 ============

    pub async fn insert_api_log(&self, req: CreateApiLogReq) -> Result<i64, AppError> {
        let created_at = writer::resolve_created_at(req.created_at, Utc::now())?;
        let params = vec![
            Value::Integer(req.user_id),
            Value::Text(req.api_path),
            Value::Text(req.method),
            Value::Text(req.request_body),
            Value::Text(req.response_body),
            Value::Integer(req.status_code),
            Value::Integer(req.duration),
            Value::Text(req.client_ip),
            Value::Text(req.user_agent),
            Value::Integer(created_at.timestamp()),
        ];
        self.insert_static(&API_LOG_SCHEMA, params).await
    }

    pub async fn query_api_logs(
        &self,
        filter: &ApiLogFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> Result<Page<ApiLog>, AppError> {
        let predicate = QueryFilter::new()
            .eq_positive("user_id", filter.user_id)
            .contains("api_path", &filter.api_path)
            .between("created_at", filter.start_time, filter.end_time);
        self.query_static(&API_LOG_SCHEMA, predicate, sort, page, ApiLog::from_row)
            .await
    }

    pub async fn api_log_detail(&self, id: i64) -> Result<ApiLog, AppError> {
        self.detail_static(&API_LOG_SCHEMA, id, ApiLog::from_row).await
    }

    // ============ 模型训练日志 ============

    pub async fn insert_training_log(&self, req: CreateModelTrainingLogReq) -> Result<i64, AppError> {
        let created_at = writer::resolve_created_at(req.created_at, Utc::now())?;
        let params = vec![
            Value::Integer(req.user_id),
            Value::Integer(req.model_id),
            Value::Text(req.model_name),
            Value::Text(req.status),
            Value::Text(req.log_level),
            Value::Text(req.log_message),
            Value::Integer(req.epoch),
            Value::Real(req.loss),
            Value::Real(req.accuracy),
            Value::Integer(req.training_time),
            Value::Integer(created_at.timestamp()),
        ];
        self.insert_static(&TRAINING_LOG_SCHEMA, params).await
    }

    pub async fn query_training_logs(
        &self,
        filter: &TrainingLogFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> Result<Page<ModelTrainingLog>, AppError> {
        let predicate = QueryFilter::new()
            .eq_positive("user_id", filter.user_id)
            .eq_positive("model_id", filter.model_id)
            .eq_text("status", &filter.status)
            .eq_text("log_level", &filter.log_level)
            .between("created_at", filter.start_time, filter.end_time);
        self.query_static(
            &TRAINING_LOG_SCHEMA,
            predicate,
            sort,
            page,
            ModelTrainingLog::from_row,
        )
        .await
    }

    pub async fn training_log_detail(&self, id: i64) -> Result<ModelTrainingLog, AppError> {
        self.detail_static(&TRAINING_LOG_SCHEMA, id, ModelTrainingLog::from_row)
            .await
    }

    // ============ 非分表通用操作 ============

    async fn insert_static(
        &self,
        schema: &'static TableSchema,
        params: Vec<Value>,
    ) -> Result<i64, AppError> {
        let sql = schema.insert_sql(schema.family);
        self.db
            .run(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| AppError::storage("insert", schema.family, e))
    }

    async fn query_static<T: Send + 'static>(
        &self,
        schema: &'static TableSchema,
        predicate: QueryFilter,
        sort: SortSpec,
        page: PageRequest,
        map_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Page<T>, AppError> {
        self.db
            .run(move |conn| {
                let tables = [schema.family.to_string()];
                query::select_page(conn, schema, &tables, &predicate, &sort, page, map_row)
            })
            .await
            .map_err(|e| AppError::storage("query", schema.family, e))
    }

    async fn detail_static<T: Send + 'static>(
        &self,
        schema: &'static TableSchema,
        id: i64,
        map_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, AppError> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE id = ?1",
            schema.select_list(),
            schema.family
        );
        let record = self
            .db
            .run(move |conn| Ok(conn.query_row(&sql, [id], map_row).optional()?))
            .await
            .map_err(|e| AppError::storage("detail", schema.family, e))?;
        record.ok_or(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::temp_database;
    use crate::logs::types::CreateModelsCallLogReq;
    use chrono::{Duration, TimeZone};

    fn store() -> (tempfile::TempDir, LogStore) {
        let (dir, db) = temp_database();
        (dir, LogStore::new(db, 31))
    }

    fn call_log(trace_id: &str, created_at: i64) -> NormalizedCallLog {
        let req = CreateModelsCallLogReq {
            trace_id: trace_id.to_string(),
            model: "gpt-x".to_string(),
            caller_key: "key-1".to_string(),
            stream: true,
            latency: 0.5,
            tokens_per_sec: 42.0,
            step: "done".to_string(),
            status_code: 200,
            created_at,
            ..Default::default()
        };
        writer::normalize(req, Utc::now()).unwrap()
    }

    fn by_trace(trace_id: &str) -> CallLogFilter {
        CallLogFilter {
            trace_id: trace_id.to_string(),
            ..Default::default()
        }
    }

    async fn partition_count(store: &LogStore, name: &str) -> i64 {
        let name = name.to_string();
        store
            .db
            .run(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [name],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_then_query_round_trip() {
        let (_dir, store) = store();
        let before = Utc::now().timestamp();
        let id = store.write_call_log(call_log("trace-rt", 0)).await.unwrap();
        let after = Utc::now().timestamp();

        let page = store
            .query_call_logs(&by_trace("trace-rt"), SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        let row = &page.rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.stream, 1);
        assert_eq!(row.latency, "0.5000");
        assert_eq!(row.tokens_per_sec, 42.0);
        assert_eq!(row.caller_key, "key-1");
        assert!(row.created_at >= before && row.created_at <= after);
        assert_eq!(row.partition, partition::partition_name(Utc::now()));
    }

    #[tokio::test]
    async fn test_zero_created_at_lands_in_today() {
        let (_dir, store) = store();
        store.write_call_log(call_log("t0", 0)).await.unwrap();
        let today = partition::partition_name(Utc::now());
        assert_eq!(partition_count(&store, &today).await, 1);
    }

    #[tokio::test]
    async fn test_pagination_and_total() {
        let (_dir, store) = store();
        for _ in 0..25 {
            store.write_call_log(call_log("paged", 0)).await.unwrap();
        }
        store.write_call_log(call_log("other", 0)).await.unwrap();

        let filter = by_trace("paged");
        let first = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(first.rows.len(), 10);
        assert_eq!(first.total, 25);

        let beyond = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(25, 10))
            .await
            .unwrap();
        assert!(beyond.rows.is_empty());
        assert_eq!(beyond.total, 25);

        // limit <= 0 按 20 处理，默认 id 倒序
        let defaulted = store
            .query_call_logs(&filter, SortSpec::parse("", &CALL_LOG_SCHEMA).unwrap(), PageRequest::new(0, -1))
            .await
            .unwrap();
        assert_eq!(defaulted.rows.len(), 20);
        assert!(defaulted.rows.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let (_dir, store) = store();
        store.write_call_log(call_log("a", 0)).await.unwrap();
        let mut other_key = call_log("a", 0);
        other_key.caller_key = "key-2".to_string();
        store.write_call_log(other_key).await.unwrap();

        let filter = CallLogFilter {
            trace_id: "a".to_string(),
            caller_key: "key-2".to_string(),
            ..Default::default()
        };
        let page = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].caller_key, "key-2");
    }

    #[tokio::test]
    async fn test_concurrent_writers_same_new_partition() {
        let (_dir, store) = store();
        let ts = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap().timestamp();

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.write_call_log(call_log("race-a", ts)).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.write_call_log(call_log("race-b", ts)).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(partition_count(&store, "status_report_20260501").await, 1);

        let filter = CallLogFilter {
            start_time: ts - 60,
            end_time: ts + 60,
            ..Default::default()
        };
        let page = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        let mut traces: Vec<_> = page.rows.iter().map(|r| r.trace_id.as_str()).collect();
        traces.sort();
        assert_eq!(traces, vec!["race-a", "race-b"]);
    }

    #[tokio::test]
    async fn test_range_query_fans_out_across_days() {
        let (_dir, store) = store();
        let day1 = Utc.with_ymd_and_hms(2026, 6, 1, 23, 0, 0).unwrap();
        let day2 = day1 + Duration::hours(2);
        store.write_call_log(call_log("fan", day1.timestamp())).await.unwrap();
        store.write_call_log(call_log("fan", day2.timestamp())).await.unwrap();

        let filter = CallLogFilter {
            trace_id: "fan".to_string(),
            start_time: day1.timestamp(),
            end_time: day2.timestamp(),
            ..Default::default()
        };
        let page = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        // 新的一天排在前面
        assert_eq!(page.rows[0].partition, "status_report_20260602");
        assert_eq!(page.rows[1].partition, "status_report_20260601");

        // 只给终点时只查终点当天
        let end_only = CallLogFilter {
            trace_id: "fan".to_string(),
            end_time: day1.timestamp(),
            ..Default::default()
        };
        let page = store
            .query_call_logs(&end_only, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_newest_day_first_when_older_day_has_more_rows() {
        let (_dir, store) = store();
        let old_day = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let new_day = Utc.with_ymd_and_hms(2026, 6, 2, 8, 0, 0).unwrap();
        for i in 0..3 {
            let log = call_log(&format!("old-{}", i), old_day.timestamp() + i);
            store.write_call_log(log).await.unwrap();
        }
        store
            .write_call_log(call_log("newest", new_day.timestamp()))
            .await
            .unwrap();

        let filter = CallLogFilter {
            start_time: old_day.timestamp(),
            end_time: new_day.timestamp(),
            ..Default::default()
        };
        let page = store
            .query_call_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        let traces: Vec<&str> = page.rows.iter().map(|r| r.trace_id.as_str()).collect();
        assert_eq!(traces, vec!["newest", "old-2"]);
    }

    #[tokio::test]
    async fn test_range_validation() {
        let (_dir, store) = store();
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let too_long = CallLogFilter {
            start_time: start.timestamp(),
            end_time: (start + Duration::days(40)).timestamp(),
            ..Default::default()
        };
        assert!(matches!(
            store
                .query_call_logs(&too_long, SortSpec::default_order(), PageRequest::new(0, 0))
                .await,
            Err(AppError::Validation(_))
        ));

        let reversed = CallLogFilter {
            start_time: start.timestamp(),
            end_time: start.timestamp() - 1,
            ..Default::default()
        };
        assert!(matches!(
            store
                .query_call_logs(&reversed, SortSpec::default_order(), PageRequest::new(0, 0))
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_query_without_partitions_is_empty() {
        let (_dir, store) = store();
        let page = store
            .query_call_logs(&CallLogFilter::default(), SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_ensure_partition_twice_and_rejects_bad_name() {
        let (_dir, store) = store();
        store.ensure_partition("status_report_20260101").await.unwrap();
        store.ensure_partition("status_report_20260101").await.unwrap();
        assert_eq!(partition_count(&store, "status_report_20260101").await, 1);

        assert!(matches!(
            store.ensure_partition("x\"; DROP TABLE api_log; --").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_call_log_detail() {
        let (_dir, store) = store();
        let ts = Utc.with_ymd_and_hms(2026, 7, 4, 12, 0, 0).unwrap();
        let id = store
            .write_call_log(call_log("detail", ts.timestamp()))
            .await
            .unwrap();

        let record = store.call_log_detail(ts, id).await.unwrap();
        assert_eq!(record.trace_id, "detail");
        assert_eq!(record.partition, "status_report_20260704");

        assert!(matches!(
            store.call_log_detail(ts, id + 100).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            store.call_log_detail(ts + Duration::days(1), id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_api_and_training_logs() {
        let (_dir, store) = store();
        store.sync_static_tables().await.unwrap();
        store.sync_static_tables().await.unwrap();

        for path in ["/v1/chat", "/v1/embed", "/v2/chat"] {
            store
                .insert_api_log(CreateApiLogReq {
                    user_id: 9,
                    api_path: path.to_string(),
                    method: "POST".to_string(),
                    created_at: 1_700_000_000,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let filter = ApiLogFilter {
            user_id: 9,
            api_path: "chat".to_string(),
            ..Default::default()
        };
        let page = store
            .query_api_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.rows[0].api_path, "/v2/chat");
        assert_eq!(store.api_log_detail(1).await.unwrap().api_path, "/v1/chat");
        assert!(matches!(store.api_log_detail(99).await, Err(AppError::NotFound)));

        let id = store
            .insert_training_log(CreateModelTrainingLogReq {
                model_id: 3,
                status: "running".to_string(),
                epoch: 2,
                loss: 0.25,
                ..Default::default()
            })
            .await
            .unwrap();
        let filter = TrainingLogFilter {
            model_id: 3,
            status: "running".to_string(),
            ..Default::default()
        };
        let page = store
            .query_training_logs(&filter, SortSpec::default_order(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        let detail = store.training_log_detail(id).await.unwrap();
        assert_eq!(detail.loss, 0.25);
        assert!(detail.created_at > 0);
    }
}
