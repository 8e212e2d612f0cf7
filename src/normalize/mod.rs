//! 规范化: 文件路由、列映射、类型转换

pub mod coerce;
pub mod mapping;
pub mod rules;

pub use coerce::{fit_numeric, is_currency_string, parse_date, parse_datetime, parse_decimal};
pub use rules::{ClassificationRules, ColumnRole, ColumnRule, Evidence, Threshold, ValueTest};

use crate::decoder::Table;
use crate::error::NormalizationWarning;
use crate::models::{Invoice, InvoiceItem};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;

pub const ACCESS_KEY_LEN: usize = 44;

/// 金额列 DECIMAL(15,2)
const MONEY: (i64, i64) = (15, 2);
/// 数量与单价列 DECIMAL(15,4)
const QUANTITY: (i64, i64) = (15, 4);

/// 按文件名决定的规范化目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    InvoiceHeader,
    InvoiceItems,
    Unrouted,
}

impl FileKind {
    /// 文件名包含 cabecalho/header -> 表头; itens/items -> 明细 (不区分大小写)
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("cabecalho") || lower.contains("header") {
            FileKind::InvoiceHeader
        } else if lower.contains("itens") || lower.contains("items") {
            FileKind::InvoiceItems
        } else {
            FileKind::Unrouted
        }
    }
}

/// 规范化结果
#[derive(Debug, Clone, Default)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub warnings: Vec<NormalizationWarning>,
}

/// 一个文件的规范化批次
#[derive(Debug, Clone)]
pub enum NormalizedBatch {
    Invoices(Normalized<Invoice>),
    Items(Normalized<InvoiceItem>),
}

impl NormalizedBatch {
    pub fn warnings(&self) -> &[NormalizationWarning] {
        match self {
            NormalizedBatch::Invoices(n) => &n.warnings,
            NormalizedBatch::Items(n) => &n.warnings,
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            NormalizedBatch::Invoices(n) => n.records.len(),
            NormalizedBatch::Items(n) => n.records.len(),
        }
    }
}

/// 按路由结果规范化; Unrouted 返回 None
pub fn normalize_table(kind: FileKind, table: &Table) -> Option<NormalizedBatch> {
    match kind {
        FileKind::InvoiceHeader => Some(NormalizedBatch::Invoices(normalize_invoices(table))),
        FileKind::InvoiceItems => Some(NormalizedBatch::Items(normalize_items(table))),
        FileKind::Unrouted => None,
    }
}

/// 规范列名 -> 源列下标; 未映射的列记录告警
fn map_columns(
    table: &Table,
    mapping: &[(&str, &'static str)],
    warnings: &mut Vec<NormalizationWarning>,
) -> IndexMap<&'static str, usize> {
    let mut index = IndexMap::new();
    for (idx, column) in table.columns.iter().enumerate() {
        match mapping::canonical_name(mapping, column) {
            Some(canonical) => {
                index.entry(canonical).or_insert(idx);
            }
            None => warnings.push(NormalizationWarning::UnmappedColumn {
                column: column.clone(),
            }),
        }
    }
    index
}

/// 单行读取器, 转换失败时写入告警
struct RowReader<'a> {
    row: &'a [Option<String>],
    row_no: usize,
    columns: &'a IndexMap<&'static str, usize>,
    warnings: &'a mut Vec<NormalizationWarning>,
}

impl<'a> RowReader<'a> {
    fn text(&self, field: &str) -> Option<String> {
        let idx = *self.columns.get(field)?;
        self.row
            .get(idx)?
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn coerce<T>(&mut self, field: &str, expected: &'static str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.text(field)?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            self.warnings.push(NormalizationWarning::UncoercibleCell {
                row: self.row_no,
                column: field.to_string(),
                value: raw,
                expected,
            });
        }
        parsed
    }

    /// 解析后按目标列的精度舍入, 放不下的值视为无法转换
    fn decimal(&mut self, field: &str, (precision, scale): (i64, i64)) -> Option<BigDecimal> {
        self.coerce(field, "decimal", |raw| {
            parse_decimal(raw).and_then(|value| fit_numeric(&value, precision, scale))
        })
    }

    fn date(&mut self, field: &str) -> Option<NaiveDate> {
        self.coerce(field, "date", parse_date)
    }

    fn datetime(&mut self, field: &str) -> Option<NaiveDateTime> {
        self.coerce(field, "timestamp", parse_datetime)
    }

    /// 访问键: 缺失返回 None (整行跳过)
    fn access_key(&mut self) -> Option<String> {
        let Some(key) = self.text("chave_acesso") else {
            self.warnings.push(NormalizationWarning::MissingAccessKey { row: self.row_no });
            return None;
        };
        let len = key.chars().count();
        if len != ACCESS_KEY_LEN {
            self.warnings.push(NormalizationWarning::UnusualAccessKey {
                row: self.row_no,
                key: key.clone(),
                len,
            });
        }
        Some(key)
    }
}

fn log_warnings(kind: &str, warnings: &[NormalizationWarning]) {
    for w in warnings {
        tracing::warn!("[{}] {}", kind, w);
    }
}

/// 表头文件 -> Invoice
pub fn normalize_invoices(table: &Table) -> Normalized<Invoice> {
    let mut warnings = Vec::new();
    let columns = map_columns(table, mapping::INVOICE_COLUMNS, &mut warnings);
    let mut records = Vec::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        let mut r = RowReader {
            row,
            row_no: i + 1,
            columns: &columns,
            warnings: &mut warnings,
        };
        let Some(chave_acesso) = r.access_key() else {
            continue;
        };

        records.push(Invoice {
            chave_acesso,
            modelo: r.text("modelo"),
            serie: r.text("serie"),
            numero: r.text("numero"),
            natureza_operacao: r.text("natureza_operacao"),
            data_emissao: r.date("data_emissao"),
            evento_recente: r.text("evento_recente"),
            data_evento: r.datetime("data_evento"),
            cnpj_emitente: r.text("cnpj_emitente"),
            razao_social_emitente: r.text("razao_social_emitente"),
            ie_emitente: r.text("ie_emitente"),
            uf_emitente: r.text("uf_emitente"),
            municipio_emitente: r.text("municipio_emitente"),
            cnpj_destinatario: r.text("cnpj_destinatario"),
            nome_destinatario: r.text("nome_destinatario"),
            uf_destinatario: r.text("uf_destinatario"),
            indicador_ie_destinatario: r.text("indicador_ie_destinatario"),
            destino_operacao: r.text("destino_operacao"),
            consumidor_final: r.text("consumidor_final"),
            presenca_comprador: r.text("presenca_comprador"),
            valor_nota_fiscal: r.decimal("valor_nota_fiscal", MONEY),
        });
    }

    log_warnings("header", &warnings);
    Normalized { records, warnings }
}

/// 明细文件 -> InvoiceItem
pub fn normalize_items(table: &Table) -> Normalized<InvoiceItem> {
    let mut warnings = Vec::new();
    let columns = map_columns(table, mapping::ITEM_COLUMNS, &mut warnings);
    let mut records = Vec::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        let mut r = RowReader {
            row,
            row_no: i + 1,
            columns: &columns,
            warnings: &mut warnings,
        };
        let Some(chave_acesso) = r.access_key() else {
            continue;
        };

        records.push(InvoiceItem {
            chave_acesso,
            numero_produto: r.text("numero_produto"),
            descricao_produto: r.text("descricao_produto"),
            codigo_ncm: r.text("codigo_ncm"),
            ncm_tipo_produto: r.text("ncm_tipo_produto"),
            cfop: r.text("cfop"),
            quantidade: r.decimal("quantidade", QUANTITY),
            unidade: r.text("unidade"),
            valor_unitario: r.decimal("valor_unitario", QUANTITY),
            valor_total: r.decimal("valor_total", MONEY),
        });
    }

    log_warnings("items", &warnings);
    Normalized { records, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode_table, DecodePolicy};
    use std::str::FromStr;

    const KEY_A: &str = "35240112345678000199550010000000011000000011";
    const KEY_B: &str = "35240112345678000199550010000000021000000022";

    #[test]
    fn test_routing() {
        assert_eq!(FileKind::from_filename("202401_NFe_NotaFiscal_Cabecalho.csv"), FileKind::InvoiceHeader);
        assert_eq!(FileKind::from_filename("invoice_HEADER.csv"), FileKind::InvoiceHeader);
        assert_eq!(FileKind::from_filename("202401_NFe_NotaFiscalItem_ITENS.csv"), FileKind::InvoiceItems);
        assert_eq!(FileKind::from_filename("items.csv"), FileKind::InvoiceItems);
        assert_eq!(FileKind::from_filename("resumo.csv"), FileKind::Unrouted);
    }

    #[test]
    fn test_normalize_invoices() {
        let csv = format!(
            "CHAVE DE ACESSO;MODELO;DATA EMISSÃO;DATA/HORA EVENTO MAIS RECENTE;CPF/CNPJ Emitente;VALOR NOTA FISCAL;OBSERVAÇÃO\n\
             {KEY_A};55 - NF-E EMITIDA EM SUBSTITUIÇÃO AO MODELO 1 OU 1A;15/01/2024;15/01/2024 10:30:00;12345678000199;1.234,56;x\n\
             {KEY_B};55;2024-01-20;;12345678000199;abc;y\n\
             ;55;2024-01-21;;;10,00;z\n"
        );
        let table = decode_table(csv.as_bytes(), &DecodePolicy::default()).unwrap();
        let result = normalize_invoices(&table);

        assert_eq!(result.records.len(), 2);
        let a = &result.records[0];
        assert_eq!(a.chave_acesso, KEY_A);
        assert_eq!(a.data_emissao, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(a.valor_nota_fiscal, Some(BigDecimal::from_str("1234.56").unwrap()));
        assert_eq!(a.cnpj_emitente.as_deref(), Some("12345678000199"));
        assert!(a.data_evento.is_some());

        let b = &result.records[1];
        assert_eq!(b.valor_nota_fiscal, None);
        assert_eq!(b.data_evento, None);

        assert!(result.warnings.contains(&NormalizationWarning::UnmappedColumn {
            column: "OBSERVAÇÃO".into()
        }));
        assert!(result.warnings.contains(&NormalizationWarning::MissingAccessKey { row: 3 }));
        assert!(result.warnings.iter().any(|w| matches!(
            w,
            NormalizationWarning::UncoercibleCell { row: 2, column, .. } if column == "valor_nota_fiscal"
        )));
    }

    #[test]
    fn test_normalize_items() {
        let csv = format!(
            "CHAVE DE ACESSO,NÚMERO PRODUTO,DESCRIÇÃO DO PRODUTO/SERVIÇO,CFOP,QUANTIDADE,UNIDADE,VALOR UNITÁRIO,VALOR TOTAL\n\
             {KEY_A},1,Widget,5102,2.0000,UN,50.0000,100.00\n\
             {KEY_A},2,Gadget,5102,\"1,5\",KG,\"R$ 20,00\",\"R$ 30,00\"\n\
             CURTA,1,Outro,5102,1,UN,1,1\n"
        );
        let table = decode_table(csv.as_bytes(), &DecodePolicy::default()).unwrap();
        let result = normalize_items(&table);

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[0].descricao_produto.as_deref(), Some("Widget"));
        assert_eq!(result.records[0].valor_total, Some(BigDecimal::from_str("100").unwrap()));
        assert_eq!(result.records[1].quantidade, Some(BigDecimal::from_str("1.5").unwrap()));
        assert_eq!(result.records[1].valor_total, Some(BigDecimal::from_str("30").unwrap()));
        assert!(result.warnings.iter().any(|w| matches!(
            w,
            NormalizationWarning::UnusualAccessKey { row: 3, len: 5, .. }
        )));
    }

    #[test]
    fn test_out_of_range_decimals_become_warnings() {
        let csv = format!(
            "CHAVE DE ACESSO;QUANTIDADE;VALOR UNITÁRIO;VALOR TOTAL\n\
             {KEY_A};1e-9223372036854775808;100000000000;1e999999999\n\
             {KEY_B};0,00005;12,34567;10000000000000,00\n"
        );
        let table = decode_table(csv.as_bytes(), &DecodePolicy::default()).unwrap();
        let result = normalize_items(&table);

        assert_eq!(result.records.len(), 2);
        let a = &result.records[0];
        assert_eq!(a.quantidade, None);
        assert_eq!(a.valor_unitario, None);
        assert_eq!(a.valor_total, None);
        let b = &result.records[1];
        assert_eq!(b.quantidade, Some(BigDecimal::from_str("0.0001").unwrap()));
        assert_eq!(b.valor_unitario, Some(BigDecimal::from_str("12.3457").unwrap()));
        assert_eq!(b.valor_total, None);

        let rejected: Vec<(usize, &str)> = result
            .warnings
            .iter()
            .filter_map(|w| match w {
                NormalizationWarning::UncoercibleCell { row, column, expected: "decimal", .. } => {
                    Some((*row, column.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            rejected,
            vec![(1, "quantidade"), (1, "valor_unitario"), (1, "valor_total"), (2, "valor_total")]
        );
    }

    #[test]
    fn test_normalize_table_routes() {
        let table = decode_table(b"a,b\n1,2\n", &DecodePolicy::default()).unwrap();
        assert!(normalize_table(FileKind::Unrouted, &table).is_none());

        let batch = normalize_table(FileKind::InvoiceItems, &table).unwrap();
        assert_eq!(batch.record_count(), 0);
        // 两列未映射 + 一行缺少访问键
        assert_eq!(batch.warnings().len(), 3);
    }
}
