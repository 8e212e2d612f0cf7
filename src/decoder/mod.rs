//! CSV 解码: 按固定顺序尝试编码与分隔符
//!
//! 第一个得到多于一列的 (编码, 分隔符) 组合胜出. 只有一列的结果视为失败,
//! 因为多半是没有命中真正的分隔符.

use crate::error::TableError;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 支持的文本编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    /// 拒绝 C1 控制字符 (0x80-0x9F), 这类字节通常意味着 Windows-1252
    Latin1,
    Windows1252,
    /// 宽松模式: 每个字节映射为同值码点, 永不失败
    Iso8859_1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Iso8859_1 => "iso-8859-1",
        }
    }

    /// 解码; 字节不符合该编码时返回 None
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(|s| s.into_owned())
            }
            TextEncoding::Latin1 => {
                if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    return None;
                }
                Some(bytes.iter().map(|&b| char::from(b)).collect())
            }
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            TextEncoding::Iso8859_1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// 解码策略: 编码与分隔符的尝试顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodePolicy {
    pub encodings: Vec<TextEncoding>,
    pub delimiters: Vec<u8>,
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self {
            encodings: vec![
                TextEncoding::Utf8,
                TextEncoding::Latin1,
                TextEncoding::Windows1252,
                TextEncoding::Iso8859_1,
            ],
            delimiters: vec![b',', b';', b'\t', b'|'],
        }
    }
}

/// 解析后的表格
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    /// 空单元格为 None
    pub rows: Vec<Vec<Option<String>>>,
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 某列全部单元格
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|v| v.as_deref()))
    }

    /// 某列非空单元格
    pub fn non_null_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.column_values(index).flatten()
    }
}

/// 按策略解码原始字节
pub fn decode_table(bytes: &[u8], policy: &DecodePolicy) -> Result<Table, TableError> {
    for &encoding in &policy.encodings {
        let Some(text) = encoding.decode(bytes) else {
            tracing::trace!("{} cannot decode content", encoding.label());
            continue;
        };

        for &delimiter in &policy.delimiters {
            match parse_delimited(&text, delimiter) {
                Some((columns, rows)) if columns.len() > 1 => {
                    tracing::debug!(
                        "Decoded table with {} / {:?}: {} columns, {} rows",
                        encoding.label(),
                        char::from(delimiter),
                        columns.len(),
                        rows.len()
                    );
                    return Ok(Table {
                        columns,
                        rows,
                        encoding,
                        delimiter,
                    });
                }
                _ => continue,
            }
        }
    }

    Err(TableError::Unparseable {
        encodings: policy.encodings.len(),
        delimiters: policy.delimiters.len(),
    })
}

type ParsedRows = (Vec<String>, Vec<Vec<Option<String>>>);

/// 用单个分隔符解析; 某行列数多于表头时返回 None
fn parse_delimited(text: &str, delimiter: u8) -> Option<ParsedRows> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .ok()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return None;
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.ok()?;
        if record.len() > columns.len() {
            return None;
        }
        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    Some((columns, rows))
}
