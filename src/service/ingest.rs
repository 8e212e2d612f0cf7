//! 导入流程: 解压 -> 解码 -> 规范化 -> 写库

use crate::archive::{self, SkippedMember};
use crate::config::IngestConfig;
use crate::db;
use crate::decoder::decode_table;
use crate::error::{ArchiveError, IngestError, NormalizationWarning};
use crate::normalize::{normalize_table, ClassificationRules, FileKind, NormalizedBatch};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// 单个文件的处理结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Normalized {
        encoding: &'static str,
        delimiter: char,
        rows: usize,
        records: usize,
    },
    /// 文件名无法判断是表头还是明细
    Unrouted,
    Unparseable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub kind: FileKind,
    pub outcome: FileOutcome,
    /// 按分类规则识别出的金额列与日期列 (原始列名)
    pub financial_columns: Vec<String>,
    pub temporal_columns: Vec<String>,
    pub warnings: Vec<NormalizationWarning>,
}

impl FileReport {
    fn new(file_name: String, kind: FileKind, outcome: FileOutcome) -> Self {
        Self {
            file_name,
            kind,
            outcome,
            financial_columns: Vec::new(),
            temporal_columns: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// 解压与规范化的结果, 尚未写库
#[derive(Debug, Clone, Default)]
pub struct PreparedArchive {
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedMember>,
    /// 按压缩包顺序
    pub batches: Vec<NormalizedBatch>,
}

impl PreparedArchive {
    pub fn invoice_count(&self) -> usize {
        self.count(|b| matches!(b, NormalizedBatch::Invoices(_)))
    }

    pub fn item_count(&self) -> usize {
        self.count(|b| matches!(b, NormalizedBatch::Items(_)))
    }

    fn count(&self, pick: impl Fn(&NormalizedBatch) -> bool) -> usize {
        self.batches
            .iter()
            .filter(|b| pick(b))
            .map(NormalizedBatch::record_count)
            .sum()
    }
}

/// 导入报告
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedMember>,
    pub invoices_upserted: u64,
    pub items_deleted: u64,
    pub items_inserted: u64,
    pub warning_count: usize,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} files: {} invoices, {} items",
            self.files.len(),
            self.invoices_upserted,
            self.items_inserted
        )
    }
}

/// 解压并规范化压缩包 (不访问数据库)
///
/// 只有压缩包本身损坏才返回错误; 单个文件的问题记录在报告中.
pub fn prepare_archive(
    bytes: &[u8],
    config: &IngestConfig,
    rules: &ClassificationRules,
) -> Result<PreparedArchive, ArchiveError> {
    let extraction = archive::extract_tabular_members(bytes, config.max_member_bytes())?;
    let mut prepared = PreparedArchive {
        skipped: extraction.skipped,
        ..Default::default()
    };

    for member in extraction.members {
        let kind = FileKind::from_filename(&member.file_name);
        let table = match decode_table(&member.bytes, &config.policy) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", member.file_name, e);
                prepared.files.push(FileReport::new(
                    member.file_name,
                    kind,
                    FileOutcome::Unparseable { reason: e.to_string() },
                ));
                continue;
            }
        };

        let financial_columns = rules.financial_columns(&table);
        let temporal_columns = rules.temporal_columns(&table);
        tracing::debug!(
            "{}: financial columns {:?}, date columns {:?}",
            member.file_name,
            financial_columns,
            temporal_columns
        );

        let Some(batch) = normalize_table(kind, &table) else {
            tracing::info!("{} is neither a header nor an items file, skipped", member.file_name);
            prepared.files.push(FileReport {
                financial_columns,
                temporal_columns,
                ..FileReport::new(member.file_name, kind, FileOutcome::Unrouted)
            });
            continue;
        };

        tracing::info!(
            "{}: {} rows -> {} records ({} warnings)",
            member.file_name,
            table.len(),
            batch.record_count(),
            batch.warnings().len()
        );
        prepared.files.push(FileReport {
            file_name: member.file_name,
            kind,
            outcome: FileOutcome::Normalized {
                encoding: table.encoding.label(),
                delimiter: char::from(table.delimiter),
                rows: table.len(),
                records: batch.record_count(),
            },
            financial_columns,
            temporal_columns,
            warnings: batch.warnings().to_vec(),
        });
        prepared.batches.push(batch);
    }

    Ok(prepared)
}

/// 导入服务
pub struct IngestService {
    pool: PgPool,
    config: IngestConfig,
    rules: Arc<ClassificationRules>,
}

impl IngestService {
    pub fn new(pool: PgPool, config: IngestConfig, rules: Arc<ClassificationRules>) -> Self {
        Self { pool, config, rules }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// 导入一个 ZIP 压缩包, 全部写入在同一事务中完成
    pub async fn ingest_archive(&self, bytes: &[u8]) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let prepared = prepare_archive(bytes, &self.config, &self.rules)?;

        let outcome = match db::merge(&self.pool, &prepared.batches).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Ingestion rolled back: {}", e);
                return Err(e.into());
            }
        };

        let report = IngestReport {
            warning_count: prepared.files.iter().map(|f| f.warnings.len()).sum(),
            files: prepared.files,
            skipped: prepared.skipped,
            invoices_upserted: outcome.invoices_upserted,
            items_deleted: outcome.items_deleted,
            items_inserted: outcome.items_inserted,
        };
        tracing::info!("{}, 耗时: {:?}", report.summary(), start.elapsed());
        Ok(report)
    }
}
