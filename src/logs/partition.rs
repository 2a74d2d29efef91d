//! 模型调用日志按天分表
//!
//! 分表边界固定为 UTC 自然日，表名为 `status_report_YYYYMMDD`。

use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::common::error::StorageResult;
use crate::db::schema::{self, CALL_LOG_SCHEMA};

/// 分表日期使用的时区
pub const PARTITION_DAY_BOUNDARY: Utc = Utc;

/// 指定日期的分表名
pub fn partition_for_day(day: NaiveDate) -> String {
    format!("{}_{}", CALL_LOG_SCHEMA.family, day.format("%Y%m%d"))
}

/// 事件时间对应的分表名
pub fn partition_name(ts: DateTime<Utc>) -> String {
    partition_for_day(ts.with_timezone(&PARTITION_DAY_BOUNDARY).date_naive())
}

/// 闭区间内每个自然日的分表名（按日期升序）
pub fn partitions_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
    let first = start.date_naive();
    let last = end.date_naive();
    let mut names = Vec::new();
    let mut day = first;
    while day <= last {
        names.push(partition_for_day(day));
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    names
}

/// 表名只允许小写字母、数字和下划线
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        && !name.as_bytes()[0].is_ascii_digit()
}

/// 确保分表存在
///
/// 返回 `true` 表示本次调用创建了该表。并发调用同一个表名时，
/// 建表在 IMMEDIATE 事务中完成，后到者等待写锁后看到已提交的表。
pub fn ensure_partition(conn: &mut Connection, name: &str) -> StorageResult<bool> {
    if schema::table_exists(conn, name)? {
        return Ok(false);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let created = !schema::table_exists(&tx, name)?;
    if created {
        schema::create_table(&tx, &CALL_LOG_SCHEMA, name)?;
    }
    tx.commit()?;
    Ok(created)
}

/// 过滤出已存在的分表
pub fn existing_partitions(conn: &Connection, names: &[String]) -> StorageResult<Vec<String>> {
    let mut existing = Vec::with_capacity(names.len());
    for name in names {
        if schema::table_exists(conn, name)? {
            existing.push(name.clone());
        }
    }
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_same_day_same_partition() {
        let a = partition_name(utc(2026, 3, 9, 0, 0, 0));
        let b = partition_name(utc(2026, 3, 9, 23, 59, 59));
        assert_eq!(a, b);
        assert_eq!(a, "status_report_20260309");
    }

    #[test]
    fn test_different_days_differ() {
        let before_midnight = partition_name(utc(2026, 12, 31, 23, 59, 59));
        let after_midnight = partition_name(utc(2027, 1, 1, 0, 0, 0));
        assert_ne!(before_midnight, after_midnight);
        assert_eq!(after_midnight, "status_report_20270101");
    }

    #[test]
    fn test_partitions_between_inclusive() {
        let names = partitions_between(utc(2026, 2, 27, 12, 0, 0), utc(2026, 3, 1, 1, 0, 0));
        assert_eq!(
            names,
            vec![
                "status_report_20260227",
                "status_report_20260228",
                "status_report_20260301",
            ]
        );
        assert!(partitions_between(utc(2026, 3, 2, 0, 0, 0), utc(2026, 3, 1, 0, 0, 0)).is_empty());
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("status_report_20260101"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1abc"));
        assert!(!is_valid_table_name("status_report\"; DROP TABLE api_log; --"));
        assert!(!is_valid_table_name("Status"));
    }

    #[test]
    fn test_ensure_partition_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        let name = "status_report_20260101";
        assert!(ensure_partition(&mut conn, name).unwrap());
        assert!(!ensure_partition(&mut conn, name).unwrap());

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(schema::recorded_version(&conn, name).unwrap(), Some(1));
    }

    #[test]
    fn test_existing_partitions_filters_missing() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_partition(&mut conn, "status_report_20260102").unwrap();
        let names = vec![
            "status_report_20260101".to_string(),
            "status_report_20260102".to_string(),
        ];
        assert_eq!(
            existing_partitions(&conn, &names).unwrap(),
            vec!["status_report_20260102".to_string()]
        );
    }
}
