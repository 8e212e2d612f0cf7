//! 列语义分类规则 (金额 / 日期 / 标识)
//!
//! 规则按顺序排列, `classify` 取第一个命中的规则. 导入诊断与即席分析共用同一套规则.

use super::coerce::{is_currency_string, is_plain_number, parse_date};
use crate::decoder::Table;
use serde::{Deserialize, Serialize};

/// 列的语义角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Financial,
    Temporal,
    Identifier,
    Other,
}

/// 命中比例阈值 (百分比, 整数比较)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Threshold {
    AtLeast(u32),
    Above(u32),
}

impl Threshold {
    fn passes(&self, hits: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        let (hits, total) = (hits as u64 * 100, total as u64);
        match *self {
            Threshold::AtLeast(pct) => hits >= total * u64::from(pct),
            Threshold::Above(pct) => hits > total * u64::from(pct),
        }
    }
}

/// 基于取值的检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTest {
    /// 所有非空值都是数字, 或样本中足够比例是货币字符串
    NumericOrCurrency { threshold: Threshold },
    /// 样本中足够比例可以解析为日期
    Dates { threshold: Threshold },
}

/// 列名与取值如何组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    NameOnly,
    NameAndValues(ValueTest),
    NameOrValues(ValueTest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub role: ColumnRole,
    pub keywords: Vec<String>,
    pub evidence: Evidence,
}

impl ColumnRule {
    fn name_matches(&self, column: &str) -> bool {
        let lower = column.trim().to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    fn values_match(&self, test: ValueTest, values: &[&str], sample_size: usize) -> bool {
        let sample = &values[..values.len().min(sample_size)];
        match test {
            ValueTest::NumericOrCurrency { threshold } => {
                if !values.is_empty() && values.iter().all(|v| is_plain_number(v)) {
                    return true;
                }
                let hits = sample.iter().filter(|v| is_currency_string(v)).count();
                threshold.passes(hits, sample.len())
            }
            ValueTest::Dates { threshold } => {
                let hits = sample.iter().filter(|v| parse_date(v).is_some()).count();
                threshold.passes(hits, sample.len())
            }
        }
    }

    /// `values` 为该列全部非空值 (按行序)
    pub fn matches(&self, column: &str, values: &[&str], sample_size: usize) -> bool {
        match self.evidence {
            Evidence::NameOnly => self.name_matches(column),
            Evidence::NameAndValues(test) => {
                self.name_matches(column) && self.values_match(test, values, sample_size)
            }
            Evidence::NameOrValues(test) => {
                self.name_matches(column) || self.values_match(test, values, sample_size)
            }
        }
    }
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// 有序规则表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub rules: Vec<ColumnRule>,
    /// 取值检查时的样本行数
    pub sample_size: usize,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            rules: vec![
                ColumnRule {
                    role: ColumnRole::Financial,
                    keywords: keywords(&[
                        "valor", "value", "amount", "total", "price", "preço", "preco", "custo", "cost",
                        "receita", "revenue", "vendas", "sales", "faturamento", "billing", "pagamento",
                        "payment",
                    ]),
                    evidence: Evidence::NameAndValues(ValueTest::NumericOrCurrency {
                        threshold: Threshold::AtLeast(70),
                    }),
                },
                ColumnRule {
                    role: ColumnRole::Temporal,
                    keywords: keywords(&[
                        "data", "date", "datetime", "timestamp", "created", "criado", "vencimento", "due",
                        "emissao", "emissão", "issued", "payment_date",
                    ]),
                    evidence: Evidence::NameOrValues(ValueTest::Dates {
                        threshold: Threshold::Above(50),
                    }),
                },
                ColumnRule {
                    role: ColumnRole::Identifier,
                    keywords: keywords(&["chave", "cnpj", "cpf", "inscrição", "inscricao", "ncm", "cfop"]),
                    evidence: Evidence::NameOnly,
                },
            ],
            sample_size: 10,
        }
    }
}

impl ClassificationRules {
    /// 第一个命中规则的角色, 都不命中为 Other
    pub fn classify(&self, column: &str, values: &[&str]) -> ColumnRole {
        self.rules
            .iter()
            .find(|rule| rule.matches(column, values, self.sample_size))
            .map(|rule| rule.role)
            .unwrap_or(ColumnRole::Other)
    }

    /// 单独评估某一角色的规则
    pub fn has_role(&self, role: ColumnRole, column: &str, values: &[&str]) -> bool {
        self.rules
            .iter()
            .filter(|rule| rule.role == role)
            .any(|rule| rule.matches(column, values, self.sample_size))
    }

    /// 表中满足某角色的列名
    pub fn columns_with_role(&self, table: &Table, role: ColumnRole) -> Vec<String> {
        table
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                let values: Vec<&str> = table.non_null_values(*idx).collect();
                self.has_role(role, name, &values)
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn financial_columns(&self, table: &Table) -> Vec<String> {
        self.columns_with_role(table, ColumnRole::Financial)
    }

    pub fn temporal_columns(&self, table: &Table) -> Vec<String> {
        self.columns_with_role(table, ColumnRole::Temporal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::TextEncoding;

    fn table(columns: &[&str], rows: Vec<Vec<&str>>) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|v| (!v.is_empty()).then(|| v.to_string())).collect())
                .collect(),
            encoding: TextEncoding::Utf8,
            delimiter: b',',
        }
    }

    #[test]
    fn test_currency_column_is_financial() {
        let rules = ClassificationRules::default();
        let mut values = vec!["R$ 1.234,56"; 7];
        values.extend(["n/d", "-", "sem valor"]);

        assert!(rules.has_role(ColumnRole::Financial, "Valor Total", &values));
        assert_eq!(rules.classify("Valor Total", &values), ColumnRole::Financial);
    }

    #[test]
    fn test_below_currency_threshold_is_not_financial() {
        let rules = ClassificationRules::default();
        let mut values = vec!["R$ 1.234,56"; 6];
        values.extend(["n/d", "-", "sem valor", "?"]);

        assert!(!rules.has_role(ColumnRole::Financial, "Valor Total", &values));
    }

    #[test]
    fn test_numeric_column_needs_keyword() {
        let rules = ClassificationRules::default();
        let values = vec!["10", "20.5", "30"];

        assert!(rules.has_role(ColumnRole::Financial, "amount", &values));
        assert!(!rules.has_role(ColumnRole::Financial, "quantidade", &values));
        assert_eq!(rules.classify("quantidade", &values), ColumnRole::Other);
    }

    #[test]
    fn test_iso_dates_are_temporal_by_value() {
        let rules = ClassificationRules::default();
        let mut values = vec!["2024-01-15"; 6];
        values.extend(["pendente", "-", "x", "?"]);

        assert!(rules.has_role(ColumnRole::Temporal, "quando", &values));

        let values_half = {
            let mut v = vec!["2024-01-15"; 5];
            v.extend(["a", "b", "c", "d", "e"]);
            v
        };
        assert!(!rules.has_role(ColumnRole::Temporal, "quando", &values_half));
    }

    #[test]
    fn test_temporal_by_name() {
        let rules = ClassificationRules::default();
        assert_eq!(rules.classify("DATA EMISSÃO", &["ontem"]), ColumnRole::Temporal);
    }

    #[test]
    fn test_identifier_and_rule_order() {
        let rules = ClassificationRules::default();
        assert_eq!(
            rules.classify("CHAVE DE ACESSO", &["35240112345678000199550010000000011000000011"]),
            ColumnRole::Identifier
        );
        assert_eq!(rules.classify("CFOP", &["5102"]), ColumnRole::Identifier);
    }

    #[test]
    fn test_sample_limited_to_first_rows() {
        let rules = ClassificationRules::default();
        // 前 10 个值都不是日期, 之后才出现日期
        let mut values = vec!["x"; 10];
        values.extend(vec!["2024-01-01"; 20]);
        assert!(!rules.has_role(ColumnRole::Temporal, "quando", &values));
    }

    #[test]
    fn test_columns_with_role_on_table() {
        let rules = ClassificationRules::default();
        let t = table(
            &["Descrição", "Valor Total", "Emitido"],
            vec![
                vec!["Widget", "R$ 100,00", "2024-01-02"],
                vec!["Gadget", "R$ 30,00", "2024-01-03"],
                vec!["", "", ""],
            ],
        );

        assert_eq!(rules.financial_columns(&t), vec!["Valor Total"]);
        assert_eq!(rules.temporal_columns(&t), vec!["Emitido"]);
    }
}
