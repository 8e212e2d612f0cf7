//! ZIP 压缩包读取: 枚举成员, 只保留 CSV 文件

use crate::error::ArchiveError;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// macOS 打包时附带的元数据目录
const METADATA_PREFIX: &str = "__MACOSX/";
const TABULAR_EXTENSION: &str = ".csv";
/// 预分配上限; 成员声明的大小不可信
const PREALLOC_LIMIT: u64 = 8 * 1024 * 1024;

/// 压缩包中的一个 CSV 成员
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// 去掉路径后的文件名
    pub file_name: String,
    /// 压缩包内完整路径
    pub path: String,
    pub bytes: Vec<u8>,
}

/// 读取失败而被跳过的成员
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMember {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub members: Vec<ArchiveMember>,
    pub skipped: Vec<SkippedMember>,
}

/// 成员元数据
#[derive(Debug, Clone, Serialize)]
pub struct MemberInfo {
    pub file_name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub last_modified: Option<NaiveDateTime>,
}

/// 是否为需要处理的 CSV 成员
fn is_tabular_entry(path: &str, is_dir: bool) -> bool {
    !is_dir
        && !path.starts_with(METADATA_PREFIX)
        && path.to_lowercase().ends_with(TABULAR_EXTENSION)
}

fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// 解压所有 CSV 成员
///
/// 压缩包本身损坏时返回 [`ArchiveError::InvalidArchive`];
/// 单个成员读取失败或解压后超过 `max_member_bytes` 只记录到 `skipped`, 不影响其他成员.
pub fn extract_tabular_members(
    bytes: &[u8],
    max_member_bytes: u64,
) -> Result<Extraction, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut extraction = Extraction::default();

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot open archive entry #{}: {}", i, e);
                extraction.skipped.push(SkippedMember {
                    path: format!("#{}", i),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.name().to_string();
        if !is_tabular_entry(&path, entry.is_dir()) {
            continue;
        }

        let capacity = entry.size().min(max_member_bytes).min(PREALLOC_LIMIT);
        let mut content = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
        if let Err(e) = (&mut entry)
            .take(max_member_bytes.saturating_add(1))
            .read_to_end(&mut content)
        {
            tracing::warn!("Error reading CSV file {}: {}", path, e);
            extraction.skipped.push(SkippedMember {
                path,
                reason: e.to_string(),
            });
            continue;
        }
        if content.len() as u64 > max_member_bytes {
            tracing::warn!("CSV file {} exceeds {} bytes, skipped", path, max_member_bytes);
            extraction.skipped.push(SkippedMember {
                path,
                reason: format!("member exceeds {} bytes", max_member_bytes),
            });
            continue;
        }

        tracing::debug!("解压 {} ({} bytes)", path, content.len());
        extraction.members.push(ArchiveMember {
            file_name: base_name(&path).to_string(),
            path,
            bytes: content,
        });
    }

    tracing::info!(
        "Archive contains {} CSV files ({} skipped)",
        extraction.members.len(),
        extraction.skipped.len()
    );
    Ok(extraction)
}

/// 列出 CSV 成员的元数据 (不解压内容)
pub fn list_members(bytes: &[u8]) -> Result<Vec<MemberInfo>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut infos = Vec::new();

    for i in 0..archive.len() {
        let entry = match archive.by_index_raw(i) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read archive entry #{}: {}", i, e);
                continue;
            }
        };
        if !is_tabular_entry(entry.name(), entry.is_dir()) {
            continue;
        }

        let modified = entry.last_modified();
        let last_modified = chrono::NaiveDate::from_ymd_opt(
            i32::from(modified.year()),
            u32::from(modified.month()),
            u32::from(modified.day()),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(modified.hour()),
                u32::from(modified.minute()),
                u32::from(modified.second()),
            )
        });

        infos.push(MemberInfo {
            file_name: base_name(entry.name()).to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            last_modified,
        });
    }

    Ok(infos)
}
