//! 即席分析: 列画像、金额统计、日期范围
//!
//! 与导入共用 [`ClassificationRules`], 供报表与 AI 上下文使用.

use crate::decoder::{Table, TextEncoding};
use crate::format::FormatContext;
use crate::normalize::{parse_date, parse_decimal, ClassificationRules, ColumnRole};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

const SAMPLE_VALUES: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub role: ColumnRole,
    pub non_null: usize,
    pub nulls: usize,
    pub distinct: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialStats {
    pub column: String,
    pub total: BigDecimal,
    pub average: BigDecimal,
    pub min: BigDecimal,
    pub max: BigDecimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub column: String,
    pub min: NaiveDate,
    pub max: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableProfile {
    pub file_name: String,
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    pub financial: Vec<FinancialStats>,
    pub dates: Vec<DateRange>,
}

fn financial_stats(column: &str, values: &[&str]) -> Option<FinancialStats> {
    let numbers: Vec<BigDecimal> = values.iter().filter_map(|v| parse_decimal(v)).collect();
    let first = numbers.first()?.clone();

    let mut total = BigDecimal::zero();
    let (mut min, mut max) = (first.clone(), first);
    for n in &numbers {
        total = &total + n;
        if *n < min {
            min = n.clone();
        }
        if *n > max {
            max = n.clone();
        }
    }
    let average = (&total / &BigDecimal::from(numbers.len() as i64)).round(4);

    Some(FinancialStats {
        column: column.to_string(),
        total,
        average,
        min,
        max,
        count: numbers.len(),
    })
}

fn date_range(column: &str, values: &[&str]) -> Option<DateRange> {
    let dates: Vec<NaiveDate> = values.iter().filter_map(|v| parse_date(v)).collect();
    Some(DateRange {
        column: column.to_string(),
        min: *dates.iter().min()?,
        max: *dates.iter().max()?,
        count: dates.len(),
    })
}

/// 对单个表格做画像
pub fn profile_table(file_name: &str, table: &Table, rules: &ClassificationRules) -> TableProfile {
    let mut columns = Vec::with_capacity(table.columns.len());
    let mut financial = Vec::new();
    let mut dates = Vec::new();

    for (idx, name) in table.columns.iter().enumerate() {
        let values: Vec<&str> = table.non_null_values(idx).collect();
        let distinct: IndexSet<&str> = values.iter().copied().collect();

        columns.push(ColumnProfile {
            name: name.clone(),
            role: rules.classify(name, &values),
            non_null: values.len(),
            nulls: table.len() - values.len(),
            distinct: distinct.len(),
            samples: values.iter().take(SAMPLE_VALUES).map(|v| v.to_string()).collect(),
        });

        if rules.has_role(ColumnRole::Financial, name, &values) {
            financial.extend(financial_stats(name, &values));
        }
        if rules.has_role(ColumnRole::Temporal, name, &values) {
            dates.extend(date_range(name, &values));
        }
    }

    TableProfile {
        file_name: file_name.to_string(),
        rows: table.len(),
        columns,
        financial,
        dates,
    }
}

/// 多个文件并行画像, 保持输入顺序
pub fn profile_tables(tables: &[(String, Table)], rules: &ClassificationRules) -> Vec<TableProfile> {
    tables
        .par_iter()
        .map(|(name, table)| profile_table(name, table, rules))
        .collect()
}

/// 查询结果转为表格: 每条记录一行, 字段名为列名
///
/// 列取自第一条记录; 数值与布尔按 JSON 文本, null 与空串为空单元格.
pub fn records_table<T: Serialize>(records: &[T]) -> Table {
    let objects: Vec<serde_json::Map<String, Value>> = records
        .iter()
        .filter_map(|record| match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect();
    let columns: Vec<String> = objects
        .first()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();

    let rows = objects
        .iter()
        .map(|map| {
            columns
                .iter()
                .map(|column| map.get(column).and_then(cell_text))
                .collect()
        })
        .collect();

    Table {
        columns,
        rows,
        encoding: TextEncoding::Utf8,
        delimiter: b',',
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => (!s.is_empty()).then(|| s.clone()),
        other => Some(other.to_string()),
    }
}

/// 金额列汇总: "Total <列>" / "Avg <列>" / "Count <列>"
pub fn financial_summary(profile: &TableProfile, fmt: &FormatContext) -> IndexMap<String, String> {
    let mut summary = IndexMap::new();
    for stats in &profile.financial {
        summary.insert(format!("Total {}", stats.column), fmt.format_currency(&stats.total));
        summary.insert(format!("Avg {}", stats.column), fmt.format_currency(&stats.average));
        summary.insert(format!("Count {}", stats.column), fmt.format_count(stats.count as u64));
    }
    summary
}

/// 日期列汇总: "<列> Range" / "<列> Count"
pub fn date_range_summary(profile: &TableProfile, fmt: &FormatContext) -> IndexMap<String, String> {
    let mut summary = IndexMap::new();
    for range in &profile.dates {
        summary.insert(
            format!("{} Range", range.column),
            format!("{} to {}", range.min.format("%Y-%m-%d"), range.max.format("%Y-%m-%d")),
        );
        summary.insert(format!("{} Count", range.column), fmt.format_count(range.count as u64));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode_table, DecodePolicy};
    use crate::models::ProductRanking;
    use std::str::FromStr;

    fn sample_table() -> Table {
        let csv = "Descrição;Valor Total;Emitido em;CNPJ\n\
                   Widget;R$ 100,00;2024-01-02;1\n\
                   Widget;R$ 50,00;2024-01-10;1\n\
                   Gadget;R$ 30,00;2024-01-05;2\n\
                   ;;;\n";
        decode_table(csv.as_bytes(), &DecodePolicy::default()).unwrap()
    }

    #[test]
    fn test_profile_table() {
        let profile = profile_table("itens.csv", &sample_table(), &ClassificationRules::default());

        assert_eq!(profile.rows, 4);
        let desc = &profile.columns[0];
        assert_eq!(desc.role, ColumnRole::Other);
        assert_eq!(desc.non_null, 3);
        assert_eq!(desc.nulls, 1);
        assert_eq!(desc.distinct, 2);
        assert_eq!(desc.samples, vec!["Widget", "Widget", "Gadget"]);

        assert_eq!(profile.columns[1].role, ColumnRole::Financial);
        assert_eq!(profile.columns[2].role, ColumnRole::Temporal);
        assert_eq!(profile.columns[3].role, ColumnRole::Identifier);

        let stats = &profile.financial[0];
        assert_eq!(stats.total, BigDecimal::from_str("180").unwrap());
        assert_eq!(stats.average, BigDecimal::from_str("60").unwrap());
        assert_eq!(stats.min, BigDecimal::from_str("30").unwrap());
        assert_eq!(stats.max, BigDecimal::from_str("100").unwrap());
        assert_eq!(stats.count, 3);

        let range = &profile.dates[0];
        assert_eq!(range.min, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(range.max, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_summaries_use_format_context() {
        let profile = profile_table("itens.csv", &sample_table(), &ClassificationRules::default());

        let money = financial_summary(&profile, &FormatContext::default());
        assert_eq!(money["Total Valor Total"], "R$ 180,00");
        assert_eq!(money["Avg Valor Total"], "R$ 60,00");
        assert_eq!(money["Count Valor Total"], "3");

        let money_us = financial_summary(&profile, &FormatContext::en_us());
        assert_eq!(money_us["Total Valor Total"], "$ 180.00");

        let dates = date_range_summary(&profile, &FormatContext::default());
        assert_eq!(dates["Emitido em Range"], "2024-01-02 to 2024-01-10");
    }

    #[test]
    fn test_huge_exponent_is_not_counted() {
        let mut csv = String::from("Produto;Valor Total\n");
        for i in 0..10 {
            csv.push_str(&format!("Item {i};R$ {i},50\n"));
        }
        csv.push_str("Outro;1e999999999\n");
        let table = decode_table(csv.as_bytes(), &DecodePolicy::default()).unwrap();

        let profile = profile_table("vendas.csv", &table, &ClassificationRules::default());
        let stats = &profile.financial[0];
        assert_eq!(stats.count, 10);
        assert_eq!(stats.total, BigDecimal::from_str("50").unwrap());
    }

    #[test]
    fn test_profile_query_records() {
        let dec = |s: &str| BigDecimal::from_str(s).unwrap();
        let products = vec![
            ProductRanking {
                descricao_produto: "Widget".into(),
                total_quantity: Some(dec("3")),
                total_value: Some(dec("150.00")),
                frequency: 2,
            },
            ProductRanking {
                descricao_produto: "Gadget".into(),
                total_quantity: None,
                total_value: Some(dec("30.00")),
                frequency: 1,
            },
        ];

        let table = records_table(&products);
        assert_eq!(table.len(), 2);
        let quantity = table.columns.iter().position(|c| c == "total_quantity").unwrap();
        assert_eq!(table.rows[1][quantity], None);

        let profile = profile_table("top_products", &table, &ClassificationRules::default());
        let value = profile
            .financial
            .iter()
            .find(|s| s.column == "total_value")
            .unwrap();
        assert_eq!(value.total, dec("180.00"));
        assert_eq!(value.count, 2);

        assert!(records_table::<ProductRanking>(&[]).columns.is_empty());
    }

    #[test]
    fn test_profile_tables_keeps_order() {
        let tables = vec![
            ("b.csv".to_string(), sample_table()),
            ("a.csv".to_string(), sample_table()),
        ];
        let profiles = profile_tables(&tables, &ClassificationRules::default());
        let names: Vec<_> = profiles.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.csv", "a.csv"]);
    }
}
