//! 数据库访问层

pub mod pool;
pub mod schema;

pub use pool::Database;

#[cfg(test)]
pub(crate) fn temp_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::open(dir.path().join("logs.db"), 4).expect("open temp database");
    (dir, db)
}
