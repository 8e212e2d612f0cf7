//! 错误类型
//!
//! - [`ArchiveError`] - 压缩包无法打开 (整次导入失败)
//! - [`TableError`] - 单个文件无法解析 (仅告警, 继续处理其余文件)
//! - [`NormalizationWarning`] - 列未映射 / 单元格无法转换 (置空, 继续)
//! - [`PersistenceError`] - 数据库失败 (整批回滚)
//! - [`ConfigError`] - 启动配置缺失
//! - [`IngestError`] - 导入流程顶层错误

use serde::Serialize;
use thiserror::Error;

/// 压缩包错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 不是合法的 ZIP 文件
    #[error("Invalid ZIP file format: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),
}

/// 表格解码错误
#[derive(Debug, Error)]
pub enum TableError {
    #[error(
        "could not parse table: none of {encodings} encodings x {delimiters} delimiters produced more than one column"
    )]
    Unparseable { encodings: usize, delimiters: usize },
}

/// 规范化告警 (不会中断导入)
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationWarning {
    #[error("column '{column}' is not part of the schema and was dropped")]
    UnmappedColumn { column: String },

    #[error("row {row}, column '{column}': cannot read '{value}' as {expected}, stored as null")]
    UncoercibleCell {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("row {row} has no access key and was skipped")]
    MissingAccessKey { row: usize },

    #[error("row {row}: access key '{key}' has {len} characters, expected 44")]
    UnusualAccessKey { row: usize, key: String, len: usize },
}

/// 持久化错误, 保留底层 sqlx 错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error while {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl PersistenceError {
    pub fn database(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| PersistenceError::Database { operation, source }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable not found")]
    MissingDatabaseUrl,

    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// 导入流程顶层错误
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Error extracting ZIP file: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Error saving data: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
