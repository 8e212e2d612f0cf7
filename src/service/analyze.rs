//! 压缩包即席分析 (不写库)

use crate::analysis::{date_range_summary, financial_summary, profile_tables, TableProfile};
use crate::archive::{self, MemberInfo};
use crate::config::IngestConfig;
use crate::decoder::decode_table;
use crate::error::ArchiveError;
use crate::format::FormatContext;
use crate::normalize::ClassificationRules;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedTable {
    pub profile: TableProfile,
    pub financial_summary: IndexMap<String, String>,
    pub date_summary: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveAnalysis {
    pub members: Vec<MemberInfo>,
    pub tables: Vec<AnalyzedTable>,
    /// 无法解码的文件及原因
    pub failures: IndexMap<String, String>,
}

pub fn analyze_archive(
    bytes: &[u8],
    config: &IngestConfig,
    rules: &ClassificationRules,
    fmt: &FormatContext,
) -> Result<ArchiveAnalysis, ArchiveError> {
    let members = archive::list_members(bytes)?;
    let extraction = archive::extract_tabular_members(bytes, config.max_member_bytes())?;

    let mut tables = Vec::new();
    let mut failures = IndexMap::new();
    for member in extraction.members {
        match decode_table(&member.bytes, &config.policy) {
            Ok(table) => tables.push((member.file_name, table)),
            Err(e) => {
                tracing::warn!("Cannot analyze {}: {}", member.file_name, e);
                failures.insert(member.file_name, e.to_string());
            }
        }
    }
    for skipped in extraction.skipped {
        failures.insert(skipped.path, skipped.reason);
    }

    let tables = profile_tables(&tables, rules)
        .into_iter()
        .map(|profile| AnalyzedTable {
            financial_summary: financial_summary(&profile, fmt),
            date_summary: date_range_summary(&profile, fmt),
            profile,
        })
        .collect();

    Ok(ArchiveAnalysis {
        members,
        tables,
        failures,
    })
}
