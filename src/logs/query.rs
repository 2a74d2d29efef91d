//! 通用的过滤 / 排序 / 分页查询构造

use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use crate::common::AppError;
use crate::common::error::StorageResult;
use crate::db::schema::TableSchema;

/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// 分页参数（已规范化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: i64,
    pub limit: i64,
}

impl PageRequest {
    /// 非正 limit 取默认值，负 skip 视为 0
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit },
        }
    }
}

/// 查询结果页
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// 忽略分页时满足条件的总数
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 排序规则，列名只能来自表结构声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(&'static str, SortDir)>,
}

impl SortSpec {
    /// 默认按 id 倒序
    pub fn default_order() -> Self {
        Self {
            keys: vec![("id", SortDir::Desc)],
        }
    }

    /// 解析 `col [asc|desc], col2 ...`，空串使用默认排序
    pub fn parse(input: &str, schema: &'static TableSchema) -> Result<Self, AppError> {
        if input.trim().is_empty() {
            return Ok(Self::default_order());
        }

        let mut keys = Vec::new();
        for part in input.split(',') {
            let mut tokens = part.split_whitespace();
            let Some(column) = tokens.next() else {
                return Err(AppError::validation(format!("invalid sort: {}", input)));
            };
            let column = lookup_column(schema, column)
                .ok_or_else(|| AppError::validation(format!("unknown sort column: {}", column)))?;
            let dir = match tokens.next().map(|d| d.to_ascii_lowercase()) {
                None => SortDir::Asc,
                Some(d) if d == "asc" => SortDir::Asc,
                Some(d) if d == "desc" => SortDir::Desc,
                Some(d) => {
                    return Err(AppError::validation(format!("invalid sort direction: {}", d)));
                }
            };
            if tokens.next().is_some() {
                return Err(AppError::validation(format!("invalid sort: {}", input)));
            }
            keys.push((column, dir));
        }
        Ok(Self { keys })
    }

    pub(crate) fn to_sql(&self) -> String {
        self.keys
            .iter()
            .map(|(col, dir)| format!("{} {}", col, dir.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 多张分表合并排序
    ///
    /// id 只在分表内唯一：以 id 为首个排序键时先按分表排序，方向与 id 一致；
    /// 其他排序键以分表名倒序作为最后一级。
    pub(crate) fn to_sql_across_tables(&self) -> String {
        match self.keys.first() {
            Some(("id", dir)) => format!("src_table {}, {}", dir.as_sql(), self.to_sql()),
            _ => format!("{}, src_table DESC", self.to_sql()),
        }
    }
}

fn lookup_column(schema: &'static TableSchema, name: &str) -> Option<&'static str> {
    if name == "id" {
        return Some("id");
    }
    schema
        .columns
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.name)
}

/// AND 连接的过滤条件，空值条件自动忽略
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, clause: String, value: Value) {
        self.clauses.push(clause);
        self.params.push(value);
    }

    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }

    /// 字符串精确匹配（空串忽略）
    pub fn eq_text(mut self, column: &'static str, value: &str) -> Self {
        if !value.is_empty() {
            let clause = format!("{} = ?{}", column, self.next_placeholder());
            self.push(clause, Value::Text(value.to_string()));
        }
        self
    }

    /// 整数精确匹配（非正数忽略）
    pub fn eq_positive(mut self, column: &'static str, value: i64) -> Self {
        if value > 0 {
            let clause = format!("{} = ?{}", column, self.next_placeholder());
            self.push(clause, Value::Integer(value));
        }
        self
    }

    /// 包含匹配（空串忽略）
    pub fn contains(mut self, column: &'static str, value: &str) -> Self {
        if !value.is_empty() {
            let clause = format!("{} LIKE ?{}", column, self.next_placeholder());
            self.push(clause, Value::Text(format!("%{}%", value)));
        }
        self
    }

    /// 闭区间范围（非正边界忽略）
    pub fn between(mut self, column: &'static str, start: i64, end: i64) -> Self {
        if start > 0 {
            let clause = format!("{} >= ?{}", column, self.next_placeholder());
            self.push(clause, Value::Integer(start));
        }
        if end > 0 {
            let clause = format!("{} <= ?{}", column, self.next_placeholder());
            self.push(clause, Value::Integer(end));
        }
        self
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// 单表或多张同结构分表（UNION ALL）的查询来源
///
/// 每行附带 `src_table` 列，值为来源表名
fn source_sql(schema: &TableSchema, tables: &[String]) -> String {
    let columns = schema.select_list();
    let parts: Vec<String> = tables
        .iter()
        .map(|t| format!("SELECT {cols}, '{t}' AS src_table FROM \"{t}\"", cols = columns, t = t))
        .collect();
    format!("({})", parts.join(" UNION ALL "))
}

/// 在同一个读事务中计算总数并取出一页
///
/// `tables` 为空时返回空页；多表时以来源表名倒序作为排序的最后一级。
pub fn select_page<T>(
    conn: &Connection,
    schema: &TableSchema,
    tables: &[String],
    filter: &QueryFilter,
    sort: &SortSpec,
    page: PageRequest,
    map_row: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StorageResult<Page<T>> {
    if tables.is_empty() {
        return Ok(Page {
            rows: Vec::new(),
            total: 0,
        });
    }

    let source = source_sql(schema, tables);
    let where_sql = filter.where_sql();

    let tx = conn.unchecked_transaction()?;

    let count_sql = format!("SELECT COUNT(*) FROM {} AS src {}", source, where_sql);
    let total: i64 = tx.query_row(
        &count_sql,
        rusqlite::params_from_iter(filter.params.iter()),
        |row| row.get(0),
    )?;

    let order_by = if tables.len() > 1 {
        sort.to_sql_across_tables()
    } else {
        sort.to_sql()
    };
    let query_sql = format!(
        "SELECT {}, src_table FROM {} AS src {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
        schema.select_list(),
        source,
        where_sql,
        order_by,
        filter.params.len() + 1,
        filter.params.len() + 2
    );
    let mut params = filter.params.clone();
    params.push(Value::Integer(page.limit));
    params.push(Value::Integer(page.skip));

    let rows = {
        let mut stmt = tx.prepare(&query_sql)?;
        stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| map_row(row))?
            .collect::<Result<Vec<_>, _>>()?
    };
    tx.commit()?;

    Ok(Page { rows, total })
}
