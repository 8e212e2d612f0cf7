//! 数字/金额格式化上下文, 显式传递给输出函数

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatContext {
    pub currency_symbol: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub fraction_digits: i64,
}

impl Default for FormatContext {
    /// 巴西雷亚尔: R$ 1.234,56
    fn default() -> Self {
        Self {
            currency_symbol: "R$".to_string(),
            decimal_separator: ',',
            grouping_separator: '.',
            fraction_digits: 2,
        }
    }
}

impl FormatContext {
    /// 英文习惯: $ 1,234.56
    pub fn en_us() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            decimal_separator: '.',
            grouping_separator: ',',
            fraction_digits: 2,
        }
    }

    pub fn format_decimal(&self, value: &BigDecimal, digits: i64) -> String {
        let text = value.round(digits).with_scale(digits).to_string();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
        if negative {
            out.push('-');
        }
        out.push_str(&self.group(int_part));
        if digits > 0 && !frac_part.is_empty() {
            out.push(self.decimal_separator);
            out.push_str(frac_part);
        }
        out
    }

    pub fn format_currency(&self, value: &BigDecimal) -> String {
        format!("{} {}", self.currency_symbol, self.format_decimal(value, self.fraction_digits))
    }

    pub fn format_count(&self, value: u64) -> String {
        self.group(&value.to_string())
    }

    fn group(&self, digits: &str) -> String {
        let len = digits.len();
        let mut out = String::with_capacity(len + len / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(self.grouping_separator);
            }
            out.push(c);
        }
        out
    }
}
